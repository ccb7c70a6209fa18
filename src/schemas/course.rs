use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Course, Lecture};
use crate::db::types::LectureKind;
use crate::services::progress::ProgressSummary;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseCreate {
    #[validate(length(min = 3, message = "title must be at least 3 characters long"))]
    pub(crate) title: String,
    #[validate(length(min = 10, message = "description must be at least 10 characters long"))]
    pub(crate) description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseUpdate {
    #[serde(default)]
    #[validate(length(min = 3, message = "title must be at least 3 characters long"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    #[validate(length(min = 10, message = "description must be at least 10 characters long"))]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct InstructorSummary {
    pub(crate) id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
}

/// The lecture projection exposed inside course payloads: enough for the
/// client to render the outline and mirror the gating rules, nothing more.
#[derive(Debug, Serialize)]
pub(crate) struct LectureSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) kind: LectureKind,
    pub(crate) order: i32,
}

impl LectureSummary {
    pub(crate) fn from_db(lecture: Lecture) -> Self {
        Self {
            id: lecture.id,
            title: lecture.title,
            kind: lecture.kind,
            order: lecture.order_index,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) instructor: InstructorSummary,
    pub(crate) lectures: Vec<LectureSummary>,
    pub(crate) students_enrolled: i64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl CourseResponse {
    pub(crate) fn from_parts(
        course: Course,
        instructor: InstructorSummary,
        lectures: Vec<LectureSummary>,
        students_enrolled: i64,
    ) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            instructor,
            lectures,
            students_enrolled,
            created_at: format_primitive(course.created_at),
            updated_at: format_primitive(course.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseSearchResponse {
    pub(crate) search_query: String,
    pub(crate) total_results: usize,
    pub(crate) courses: Vec<CourseResponse>,
}

/// Enrollment view: membership flag, the summary when enrolled, and the same
/// full course projection the catalog returns.
#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentStatusResponse {
    pub(crate) is_enrolled: bool,
    pub(crate) progress: Option<ProgressSummary>,
    pub(crate) course: CourseResponse,
}
