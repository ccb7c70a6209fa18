use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::ProgressEntry;
use crate::services::progress::{LectureOutcome, LectureState, ProgressSummary};

#[derive(Debug, Deserialize)]
pub(crate) struct MarkStartedRequest {
    pub(crate) course_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MarkCompletedRequest {
    pub(crate) course_id: String,
    pub(crate) outcome: LectureOutcome,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProgressEntryResponse {
    pub(crate) lecture_id: String,
    pub(crate) state: LectureState,
    pub(crate) is_completed: bool,
    pub(crate) is_passed: bool,
    pub(crate) score: Option<f64>,
    pub(crate) correct_answers: Option<i32>,
    pub(crate) total_questions: Option<i32>,
    pub(crate) updated_at: String,
}

impl ProgressEntryResponse {
    pub(crate) fn from_db(entry: ProgressEntry) -> Self {
        let state = crate::services::progress::lecture_state(Some(&entry));
        Self {
            lecture_id: entry.lecture_id,
            state,
            is_completed: entry.is_completed,
            is_passed: entry.is_passed,
            score: entry.score,
            correct_answers: entry.correct_answers,
            total_questions: entry.total_questions,
            updated_at: format_primitive(entry.updated_at),
        }
    }
}

/// One row per lecture of the course, in order, pairing the entry (if any)
/// with the server-side gating verdict.
#[derive(Debug, Serialize)]
pub(crate) struct LectureProgressResponse {
    pub(crate) lecture_id: String,
    pub(crate) order: i32,
    pub(crate) unlocked: bool,
    pub(crate) state: LectureState,
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseProgressResponse {
    pub(crate) course_id: String,
    pub(crate) entries: Vec<ProgressEntryResponse>,
    pub(crate) lectures: Vec<LectureProgressResponse>,
    pub(crate) summary: ProgressSummary,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompletionResponse {
    pub(crate) is_completed: bool,
    pub(crate) is_passed: bool,
    pub(crate) entry: ProgressEntryResponse,
    pub(crate) summary: ProgressSummary,
}
