use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_enrollment, CurrentStudent};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Lecture, ProgressEntry, User};
use crate::repositories;
use crate::repositories::enrollments::EnrollOutcome;
use crate::schemas::course::{CourseResponse, EnrollmentStatusResponse};
use crate::schemas::progress::{
    CompletionResponse, CourseProgressResponse, LectureProgressResponse, MarkCompletedRequest,
    MarkStartedRequest, ProgressEntryResponse,
};
use crate::services::progress;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/enroll/:course_id", post(enroll).delete(unenroll))
        .route("/courses", get(enrolled_courses))
        .route("/courses/:course_id/status", get(enrollment_status))
        .route("/courses/:course_id/progress", get(course_progress))
        .route("/lectures/:lecture_id/start", post(mark_started))
        .route("/lectures/:lecture_id/complete", post(mark_completed))
}

async fn enroll(
    Path(course_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<EnrollmentStatusResponse>), ApiError> {
    let course = fetch_course(&state, &course_id).await?;

    let outcome = repositories::enrollments::enroll(
        state.db(),
        &Uuid::new_v4().to_string(),
        &student.id,
        &course.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to enroll"))?;

    if matches!(outcome, EnrollOutcome::AlreadyEnrolled) {
        return Err(ApiError::Conflict("Already enrolled in this course".to_string()));
    }

    tracing::info!(
        student_id = %student.id,
        course_id = %course.id,
        action = "enroll",
        "Student enrolled in course"
    );

    let response = status_response(&state, &student, course).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn unenroll(
    Path(course_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    fetch_course(&state, &course_id).await?;

    let removed = repositories::enrollments::unenroll(state.db(), &student.id, &course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to unenroll"))?;

    if !removed {
        return Err(ApiError::BadRequest("Not enrolled in this course".to_string()));
    }

    tracing::info!(
        student_id = %student.id,
        course_id = %course_id,
        action = "unenroll",
        "Student left course, progress removed"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn enrolled_courses(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = repositories::enrollments::list_courses_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrolled courses"))?;

    let mut response = Vec::with_capacity(courses.len());
    for course in courses {
        response.push(crate::api::courses::course_response(&state, course).await?);
    }

    Ok(Json(response))
}

async fn enrollment_status(
    Path(course_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentStatusResponse>, ApiError> {
    let course = fetch_course(&state, &course_id).await?;
    let response = status_response(&state, &student, course).await?;
    Ok(Json(response))
}

async fn course_progress(
    Path(course_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<CourseProgressResponse>, ApiError> {
    let course = fetch_course(&state, &course_id).await?;
    require_enrollment(&state, &student, &course.id).await?;

    let lectures = repositories::lectures::list_for_course(state.db(), &course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list lectures"))?;
    let entries = repositories::progress::list_for_pair(state.db(), &student.id, &course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load progress"))?;

    let ordered: Vec<(String, _)> =
        lectures.iter().map(|lecture| (lecture.id.clone(), lecture.kind)).collect();
    let flags = progress::unlocked_flags(&ordered, &entries);
    let summary = progress::course_summary(lectures.len(), &entries);

    let lecture_rows = lectures
        .iter()
        .zip(flags)
        .map(|(lecture, unlocked)| LectureProgressResponse {
            lecture_id: lecture.id.clone(),
            order: lecture.order_index,
            unlocked,
            state: progress::lecture_state(
                entries.iter().find(|entry| entry.lecture_id == lecture.id),
            ),
        })
        .collect();

    Ok(Json(CourseProgressResponse {
        course_id: course.id,
        entries: entries.into_iter().map(ProgressEntryResponse::from_db).collect(),
        lectures: lecture_rows,
        summary,
    }))
}

async fn mark_started(
    Path(lecture_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<MarkStartedRequest>,
) -> Result<Json<ProgressEntryResponse>, ApiError> {
    let lecture = fetch_lecture_in_course(&state, &lecture_id, &payload.course_id).await?;
    require_enrollment(&state, &student, &lecture.course_id).await?;
    require_unlocked(&state, &student, &lecture).await?;

    repositories::progress::mark_started(
        state.db(),
        &Uuid::new_v4().to_string(),
        &student.id,
        &lecture.course_id,
        &lecture.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record lecture start"))?;

    let entries =
        repositories::progress::list_for_pair(state.db(), &student.id, &lecture.course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load progress"))?;
    let entry = entries
        .into_iter()
        .find(|entry| entry.lecture_id == lecture.id)
        .ok_or_else(|| ApiError::Internal("Progress entry missing after start".to_string()))?;

    Ok(Json(ProgressEntryResponse::from_db(entry)))
}

async fn mark_completed(
    Path(lecture_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<MarkCompletedRequest>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let lecture = fetch_lecture_in_course(&state, &lecture_id, &payload.course_id).await?;
    require_enrollment(&state, &student, &lecture.course_id).await?;
    require_unlocked(&state, &student, &lecture).await?;

    let update = progress::grade(lecture.kind, payload.outcome)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let entry = repositories::progress::apply_completion(
        state.db(),
        &Uuid::new_v4().to_string(),
        &student.id,
        &lecture.course_id,
        &lecture.id,
        update,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record completion"))?;

    tracing::info!(
        student_id = %student.id,
        lecture_id = %lecture.id,
        course_id = %lecture.course_id,
        passed = entry.is_passed,
        action = "lecture_complete",
        "Completion recorded"
    );

    let entries =
        repositories::progress::list_for_pair(state.db(), &student.id, &lecture.course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load progress"))?;
    let total = repositories::lectures::count_for_course(state.db(), &lecture.course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count lectures"))?;

    Ok(Json(CompletionResponse {
        is_completed: entry.is_completed,
        is_passed: entry.is_passed,
        entry: ProgressEntryResponse::from_db(entry),
        summary: progress::course_summary(total as usize, &entries),
    }))
}

async fn fetch_course(
    state: &AppState,
    course_id: &str,
) -> Result<crate::db::models::Course, ApiError> {
    repositories::courses::find_by_id(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))
}

/// Loads the lecture and cross-checks the course the client claims it
/// belongs to, so a valid token cannot write progress into another course.
async fn fetch_lecture_in_course(
    state: &AppState,
    lecture_id: &str,
    course_id: &str,
) -> Result<Lecture, ApiError> {
    let lecture = repositories::lectures::find_by_id(state.db(), lecture_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch lecture"))?
        .ok_or_else(|| ApiError::NotFound("Lecture not found".to_string()))?;

    if lecture.course_id != course_id {
        return Err(ApiError::BadRequest(
            "Lecture does not belong to the given course".to_string(),
        ));
    }

    Ok(lecture)
}

/// The server is the authority on gating; a client that skips ahead gets a
/// 403 regardless of what its own unlocked flags said.
async fn require_unlocked(
    state: &AppState,
    student: &User,
    lecture: &Lecture,
) -> Result<(), ApiError> {
    let lectures = repositories::lectures::list_for_course(state.db(), &lecture.course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list lectures"))?;
    let entries =
        repositories::progress::list_for_pair(state.db(), &student.id, &lecture.course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load progress"))?;

    let ordered: Vec<(String, _)> =
        lectures.iter().map(|item| (item.id.clone(), item.kind)).collect();
    let index = lectures
        .iter()
        .position(|item| item.id == lecture.id)
        .ok_or_else(|| ApiError::NotFound("Lecture not found".to_string()))?;

    if progress::is_unlocked(index, &ordered, &entries) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Previous lecture must be completed first"))
    }
}

async fn status_response(
    state: &AppState,
    student: &User,
    course: crate::db::models::Course,
) -> Result<EnrollmentStatusResponse, ApiError> {
    let is_enrolled = repositories::enrollments::is_enrolled(state.db(), &student.id, &course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check enrollment"))?;

    let progress_summary = if is_enrolled {
        let total = repositories::lectures::count_for_course(state.db(), &course.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count lectures"))?;
        let entries: Vec<ProgressEntry> =
            repositories::progress::list_for_pair(state.db(), &student.id, &course.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to load progress"))?;
        Some(progress::course_summary(total as usize, &entries))
    } else {
        None
    };

    Ok(EnrollmentStatusResponse {
        is_enrolled,
        progress: progress_summary,
        course: crate::api::courses::course_response(state, course).await?,
    })
}

#[cfg(test)]
mod tests;
