use axum::extract::{Path, Query, State};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_owner, CurrentInstructor, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Course;
use crate::repositories;
use crate::schemas::course::{
    CourseCreate, CourseResponse, CourseSearchResponse, CourseUpdate, InstructorSummary,
    LectureSummary,
};
use crate::schemas::user::UserResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/search", get(search_courses))
        .route("/mine", get(my_courses))
        .route(
            "/:course_id",
            get(get_course).patch(update_course).delete(delete_course),
        )
        .route("/:course_id/students", get(list_course_students))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

async fn create_course(
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> Result<(axum::http::StatusCode, Json<CourseResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let course = repositories::courses::create(
        state.db(),
        repositories::courses::CreateCourse {
            id: &Uuid::new_v4().to_string(),
            title: payload.title.trim(),
            description: payload.description.trim(),
            instructor_id: &instructor.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create course"))?;

    let response = course_response(&state, course).await?;
    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

async fn list_courses(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = repositories::courses::list_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    let mut response = Vec::with_capacity(courses.len());
    for course in courses {
        response.push(course_response(&state, course).await?);
    }

    Ok(Json(response))
}

async fn search_courses(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<CourseSearchResponse>, ApiError> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Search query is required".to_string()))?
        .to_string();

    let courses = repositories::courses::search(state.db(), &query)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to search courses"))?;

    let mut results = Vec::with_capacity(courses.len());
    for course in courses {
        results.push(course_response(&state, course).await?);
    }

    Ok(Json(CourseSearchResponse {
        search_query: query,
        total_results: results.len(),
        courses: results,
    }))
}

async fn my_courses(
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = repositories::courses::list_by_instructor(state.db(), &instructor.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list own courses"))?;

    let mut response = Vec::with_capacity(courses.len());
    for course in courses {
        response.push(course_response(&state, course).await?);
    }

    Ok(Json(response))
}

async fn get_course(
    CurrentUser(_user): CurrentUser,
    Path(course_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = repositories::courses::find_by_id(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    Ok(Json(course_response(&state, course).await?))
}

async fn update_course(
    Path(course_id): Path<String>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<CourseUpdate>,
) -> Result<Json<CourseResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    require_course_owner(&state, &instructor, &course_id).await?;

    repositories::courses::update(
        state.db(),
        &course_id,
        repositories::courses::UpdateCourse {
            title: payload.title.map(|value| value.trim().to_string()),
            description: payload.description.map(|value| value.trim().to_string()),
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update course"))?;

    let updated = repositories::courses::fetch_one_by_id(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated course"))?;

    Ok(Json(course_response(&state, updated).await?))
}

async fn delete_course(
    Path(course_id): Path<String>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<axum::http::StatusCode, ApiError> {
    require_course_owner(&state, &instructor, &course_id).await?;

    let deleted = repositories::courses::delete_cascade(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete course"))?;

    if !deleted {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    tracing::info!(
        instructor_id = %instructor.id,
        course_id = %course_id,
        action = "course_delete",
        "Instructor deleted course"
    );

    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn list_course_students(
    Path(course_id): Path<String>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    require_course_owner(&state, &instructor, &course_id).await?;

    let student_ids =
        repositories::enrollments::list_student_ids_for_course(state.db(), &course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list enrolled students"))?;

    let mut students = Vec::with_capacity(student_ids.len());
    for student_id in student_ids {
        let user = repositories::users::find_by_id(state.db(), &student_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
            .ok_or_else(|| ApiError::Internal("Enrolled student is missing".to_string()))?;
        students.push(UserResponse::from_db(user));
    }

    Ok(Json(students))
}

/// Builds the full course projection: owner summary, ordered lecture
/// summaries, and the derived enrolled-student count.
pub(crate) async fn course_response(
    state: &AppState,
    course: Course,
) -> Result<CourseResponse, ApiError> {
    let instructor = repositories::users::find_by_id(state.db(), &course.instructor_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch instructor"))?
        .ok_or_else(|| ApiError::Internal("Course instructor is missing".to_string()))?;

    let lectures = repositories::lectures::list_for_course(state.db(), &course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list lectures"))?;

    let students_enrolled = repositories::enrollments::count_for_course(state.db(), &course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count enrollments"))?;

    Ok(CourseResponse::from_parts(
        course,
        InstructorSummary {
            id: instructor.id,
            full_name: instructor.full_name,
            email: instructor.email,
        },
        lectures.into_iter().map(LectureSummary::from_db).collect(),
        students_enrolled,
    ))
}
