use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{AnswerOption, Lecture, Question};
use crate::db::types::LectureKind;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LectureCreate {
    pub(crate) course_id: String,
    #[validate(length(min = 3, message = "title must be at least 3 characters long"))]
    pub(crate) title: String,
    pub(crate) kind: LectureKind,
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default)]
    pub(crate) questions: Vec<QuestionPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionPayload {
    pub(crate) text: String,
    pub(crate) options: Vec<AnswerOptionPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerOptionPayload {
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) is_correct: bool,
}

impl AnswerOptionPayload {
    pub(crate) fn into_db(self) -> AnswerOption {
        AnswerOption { text: self.text.trim().to_string(), is_correct: self.is_correct }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LectureUpdate {
    #[serde(default)]
    #[validate(length(min = 3, message = "title must be at least 3 characters long"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default)]
    pub(crate) questions: Option<Vec<QuestionPayload>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) position: i32,
    pub(crate) text: String,
    pub(crate) options: Vec<AnswerOption>,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            position: question.position,
            text: question.text,
            options: question.options.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LectureResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) kind: LectureKind,
    pub(crate) content: String,
    pub(crate) order: i32,
    pub(crate) questions: Vec<QuestionResponse>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl LectureResponse {
    pub(crate) fn from_parts(lecture: Lecture, questions: Vec<Question>) -> Self {
        Self {
            id: lecture.id,
            course_id: lecture.course_id,
            title: lecture.title,
            kind: lecture.kind,
            content: lecture.content,
            order: lecture.order_index,
            questions: questions.into_iter().map(QuestionResponse::from_db).collect(),
            created_at: format_primitive(lecture.created_at),
            updated_at: format_primitive(lecture.updated_at),
        }
    }
}
