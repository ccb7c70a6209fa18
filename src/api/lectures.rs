use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_owner, CurrentInstructor, CurrentUser};
use crate::api::validation::validate_questions;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Lecture;
use crate::db::types::LectureKind;
use crate::repositories;
use crate::schemas::lecture::{LectureCreate, LectureResponse, LectureUpdate, QuestionPayload};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(create_lecture))
        .route("/course/:course_id", get(list_for_course))
        .route(
            "/:lecture_id",
            get(get_lecture).patch(update_lecture).delete(delete_lecture),
        )
}

async fn create_lecture(
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<LectureCreate>,
) -> Result<(StatusCode, Json<LectureResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    require_course_owner(&state, &instructor, &payload.course_id).await?;

    match payload.kind {
        LectureKind::Quiz => {
            if payload.questions.is_empty() {
                return Err(ApiError::BadRequest(
                    "A quiz lecture must have at least one question".to_string(),
                ));
            }
            validate_questions(&payload.questions)?;
        }
        LectureKind::Reading => {
            if !payload.questions.is_empty() {
                return Err(ApiError::BadRequest(
                    "A reading lecture cannot carry questions".to_string(),
                ));
            }
        }
    }

    let lecture = repositories::lectures::create(
        state.db(),
        repositories::lectures::CreateLecture {
            id: &Uuid::new_v4().to_string(),
            course_id: &payload.course_id,
            title: payload.title.trim(),
            kind: payload.kind,
            content: payload.content.as_deref().unwrap_or("").trim(),
            questions: payload.questions.into_iter().map(into_new_question).collect(),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create lecture"))?;

    let response = lecture_response(&state, lecture).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_for_course(
    CurrentUser(_user): CurrentUser,
    Path(course_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<LectureResponse>>, ApiError> {
    repositories::courses::find_by_id(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    let lectures = repositories::lectures::list_for_course(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list lectures"))?;

    let mut response = Vec::with_capacity(lectures.len());
    for lecture in lectures {
        response.push(lecture_response(&state, lecture).await?);
    }

    Ok(Json(response))
}

async fn get_lecture(
    CurrentUser(_user): CurrentUser,
    Path(lecture_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LectureResponse>, ApiError> {
    let lecture = fetch_lecture(&state, &lecture_id).await?;
    Ok(Json(lecture_response(&state, lecture).await?))
}

async fn update_lecture(
    Path(lecture_id): Path<String>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<LectureUpdate>,
) -> Result<Json<LectureResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let lecture = fetch_lecture(&state, &lecture_id).await?;
    require_course_owner(&state, &instructor, &lecture.course_id).await?;

    let questions = match payload.questions {
        Some(questions) => {
            if lecture.kind != LectureKind::Quiz {
                return Err(ApiError::BadRequest(
                    "Only quiz lectures carry questions".to_string(),
                ));
            }
            if questions.is_empty() {
                return Err(ApiError::BadRequest(
                    "A quiz lecture must have at least one question".to_string(),
                ));
            }
            validate_questions(&questions)?;
            Some(questions.into_iter().map(into_new_question).collect())
        }
        None => None,
    };

    repositories::lectures::update(
        state.db(),
        &lecture_id,
        repositories::lectures::UpdateLecture {
            title: payload.title.map(|value| value.trim().to_string()),
            content: payload.content.map(|value| value.trim().to_string()),
            questions,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update lecture"))?;

    let updated = fetch_lecture(&state, &lecture_id).await?;
    Ok(Json(lecture_response(&state, updated).await?))
}

async fn delete_lecture(
    Path(lecture_id): Path<String>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let lecture = fetch_lecture(&state, &lecture_id).await?;
    require_course_owner(&state, &instructor, &lecture.course_id).await?;

    repositories::lectures::delete_and_renumber(
        state.db(),
        &lecture.id,
        &lecture.course_id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to delete lecture"))?;

    tracing::info!(
        instructor_id = %instructor.id,
        lecture_id = %lecture.id,
        course_id = %lecture.course_id,
        action = "lecture_delete",
        "Instructor deleted lecture"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_lecture(state: &AppState, lecture_id: &str) -> Result<Lecture, ApiError> {
    repositories::lectures::find_by_id(state.db(), lecture_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch lecture"))?
        .ok_or_else(|| ApiError::NotFound("Lecture not found".to_string()))
}

async fn lecture_response(
    state: &AppState,
    lecture: Lecture,
) -> Result<LectureResponse, ApiError> {
    let questions = repositories::lectures::list_questions(state.db(), &lecture.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;
    Ok(LectureResponse::from_parts(lecture, questions))
}

fn into_new_question(payload: QuestionPayload) -> repositories::lectures::NewQuestion {
    repositories::lectures::NewQuestion {
        text: payload.text.trim().to_string(),
        options: payload.options.into_iter().map(|option| option.into_db()).collect(),
    }
}
