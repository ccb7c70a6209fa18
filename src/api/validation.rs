use crate::api::errors::ApiError;
use crate::schemas::lecture::QuestionPayload;

/// Quiz questions must each carry at least two options and at least one
/// correct answer; an empty question list is rejected upstream.
pub(crate) fn validate_questions(questions: &[QuestionPayload]) -> Result<(), ApiError> {
    for question in questions {
        if question.text.trim().is_empty() {
            return Err(ApiError::BadRequest("Question text must not be empty".to_string()));
        }
        if question.options.len() < 2 {
            return Err(ApiError::BadRequest(
                "Each question must have at least 2 options".to_string(),
            ));
        }
        if question.options.iter().any(|option| option.text.trim().is_empty()) {
            return Err(ApiError::BadRequest("Option text must not be empty".to_string()));
        }
        if !question.options.iter().any(|option| option.is_correct) {
            return Err(ApiError::BadRequest(
                "Each question must have at least one correct option".to_string(),
            ));
        }
    }
    Ok(())
}
