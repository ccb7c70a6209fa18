use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::ProgressEntry;
use crate::db::types::LectureKind;

/// What the student submitted for a lecture. The caller decides the variant
/// explicitly; nothing is inferred from payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum LectureOutcome {
    /// A reading lecture was read to the end.
    Reading,
    /// A quiz submission with per-question results.
    Quiz { correct_answers: i32, total_questions: i32 },
    /// Percentage-only result kept for older clients.
    LegacyScore { percent: f64 },
}

/// Field updates to apply to the (student, course, lecture) progress entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CompletionUpdate {
    pub(crate) is_completed: bool,
    pub(crate) is_passed: bool,
    pub(crate) score: Option<f64>,
    pub(crate) correct_answers: Option<i32>,
    pub(crate) total_questions: Option<i32>,
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum GradingError {
    #[error("a quiz submission is required for quiz lectures")]
    QuizResultRequired,
    #[error("a quiz submission is not valid for reading lectures")]
    UnexpectedQuizResult,
    #[error("total_questions must be positive")]
    EmptyQuiz,
    #[error("correct_answers cannot exceed total_questions")]
    TooManyCorrect,
    #[error("percent must be within 0..=100")]
    PercentOutOfRange,
}

/// Grades a completion submission against the lecture kind.
///
/// Reading lectures complete unconditionally and carry no pass/fail notion.
/// Quizzes pass only when every question is correct; a failed attempt stays
/// `is_completed = false` and is overwritten on retry. The legacy
/// percentage path follows the same strict rule: only 100% passes.
pub(crate) fn grade(
    kind: LectureKind,
    outcome: LectureOutcome,
) -> Result<CompletionUpdate, GradingError> {
    match (kind, outcome) {
        (LectureKind::Reading, LectureOutcome::Reading) => Ok(CompletionUpdate {
            is_completed: true,
            is_passed: true,
            score: None,
            correct_answers: None,
            total_questions: None,
        }),
        (LectureKind::Reading, _) => Err(GradingError::UnexpectedQuizResult),
        (LectureKind::Quiz, LectureOutcome::Quiz { correct_answers, total_questions }) => {
            if total_questions <= 0 {
                return Err(GradingError::EmptyQuiz);
            }
            if correct_answers < 0 || correct_answers > total_questions {
                return Err(GradingError::TooManyCorrect);
            }
            let passed = correct_answers == total_questions;
            Ok(CompletionUpdate {
                is_completed: passed,
                is_passed: passed,
                score: None,
                correct_answers: Some(correct_answers),
                total_questions: Some(total_questions),
            })
        }
        (LectureKind::Quiz, LectureOutcome::LegacyScore { percent }) => {
            if !(0.0..=100.0).contains(&percent) {
                return Err(GradingError::PercentOutOfRange);
            }
            let passed = percent == 100.0;
            Ok(CompletionUpdate {
                is_completed: passed,
                is_passed: passed,
                score: Some(percent),
                correct_answers: None,
                total_questions: None,
            })
        }
        (LectureKind::Quiz, LectureOutcome::Reading) => Err(GradingError::QuizResultRequired),
    }
}

/// Derived lecture state; never stored, always recomputed from the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LectureState {
    NotVisited,
    Started,
    Completed,
    Failed,
}

pub(crate) fn lecture_state(entry: Option<&ProgressEntry>) -> LectureState {
    match entry {
        None => LectureState::NotVisited,
        Some(entry) if entry.is_completed => LectureState::Completed,
        Some(entry) if !entry.is_passed => LectureState::Failed,
        Some(_) => LectureState::Started,
    }
}

/// Whether the lecture at `index` in the ordered list is reachable.
///
/// The first lecture is always open. Any later lecture opens only once its
/// predecessor is completed, and additionally passed when the predecessor is
/// a quiz. Depends on nothing but the ordered list and the progress
/// snapshot, so the client can re-derive the same answer.
pub(crate) fn is_unlocked(
    index: usize,
    lectures: &[(String, LectureKind)],
    entries: &[ProgressEntry],
) -> bool {
    if index == 0 {
        return true;
    }
    let Some((prev_id, prev_kind)) = lectures.get(index - 1) else {
        return false;
    };

    let Some(entry) = entries.iter().find(|entry| entry.lecture_id == *prev_id) else {
        return false;
    };

    match prev_kind {
        LectureKind::Reading => entry.is_completed,
        LectureKind::Quiz => entry.is_completed && entry.is_passed,
    }
}

pub(crate) fn unlocked_flags(
    lectures: &[(String, LectureKind)],
    entries: &[ProgressEntry],
) -> Vec<bool> {
    (0..lectures.len()).map(|index| is_unlocked(index, lectures, entries)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct ProgressSummary {
    pub(crate) total_lectures: i64,
    pub(crate) completed_lectures: i64,
    pub(crate) progress_percentage: i64,
}

pub(crate) fn course_summary(total_lectures: usize, entries: &[ProgressEntry]) -> ProgressSummary {
    let completed = entries.iter().filter(|entry| entry.is_completed).count();
    let percentage = if total_lectures > 0 {
        ((completed as f64 / total_lectures as f64) * 100.0).round() as i64
    } else {
        0
    };

    ProgressSummary {
        total_lectures: total_lectures as i64,
        completed_lectures: completed as i64,
        progress_percentage: percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;

    fn entry(lecture_id: &str, is_completed: bool, is_passed: bool) -> ProgressEntry {
        ProgressEntry {
            id: format!("entry-{lecture_id}"),
            student_id: "student-1".to_string(),
            course_id: "course-1".to_string(),
            lecture_id: lecture_id.to_string(),
            is_completed,
            is_passed,
            score: None,
            correct_answers: None,
            total_questions: None,
            updated_at: primitive_now_utc(),
        }
    }

    #[test]
    fn reading_always_completes() {
        let update = grade(LectureKind::Reading, LectureOutcome::Reading).expect("grade");
        assert!(update.is_completed);
        assert!(update.is_passed);
        assert_eq!(update.correct_answers, None);
    }

    #[test]
    fn quiz_passes_only_on_perfect_score() {
        let update = grade(
            LectureKind::Quiz,
            LectureOutcome::Quiz { correct_answers: 2, total_questions: 2 },
        )
        .expect("grade");
        assert!(update.is_completed);
        assert!(update.is_passed);
        assert_eq!(update.correct_answers, Some(2));
        assert_eq!(update.total_questions, Some(2));
    }

    #[test]
    fn quiz_partial_credit_fails() {
        let update = grade(
            LectureKind::Quiz,
            LectureOutcome::Quiz { correct_answers: 1, total_questions: 2 },
        )
        .expect("grade");
        assert!(!update.is_completed);
        assert!(!update.is_passed);
        assert_eq!(update.correct_answers, Some(1));
    }

    #[test]
    fn quiz_rejects_malformed_counts() {
        assert_eq!(
            grade(
                LectureKind::Quiz,
                LectureOutcome::Quiz { correct_answers: 0, total_questions: 0 }
            ),
            Err(GradingError::EmptyQuiz)
        );
        assert_eq!(
            grade(
                LectureKind::Quiz,
                LectureOutcome::Quiz { correct_answers: 3, total_questions: 2 }
            ),
            Err(GradingError::TooManyCorrect)
        );
    }

    #[test]
    fn legacy_percent_applies_strict_pass_rule() {
        let passed =
            grade(LectureKind::Quiz, LectureOutcome::LegacyScore { percent: 100.0 }).expect("grade");
        assert!(passed.is_completed);
        assert_eq!(passed.score, Some(100.0));

        let failed =
            grade(LectureKind::Quiz, LectureOutcome::LegacyScore { percent: 99.0 }).expect("grade");
        assert!(!failed.is_completed);
        assert!(!failed.is_passed);
        assert_eq!(failed.score, Some(99.0));

        assert_eq!(
            grade(LectureKind::Quiz, LectureOutcome::LegacyScore { percent: 101.0 }),
            Err(GradingError::PercentOutOfRange)
        );
    }

    #[test]
    fn outcome_and_kind_must_agree() {
        assert_eq!(
            grade(LectureKind::Quiz, LectureOutcome::Reading),
            Err(GradingError::QuizResultRequired)
        );
        assert_eq!(
            grade(
                LectureKind::Reading,
                LectureOutcome::Quiz { correct_answers: 1, total_questions: 1 }
            ),
            Err(GradingError::UnexpectedQuizResult)
        );
    }

    #[test]
    fn state_derivation() {
        assert_eq!(lecture_state(None), LectureState::NotVisited);
        assert_eq!(lecture_state(Some(&entry("l1", false, true))), LectureState::Started);
        assert_eq!(lecture_state(Some(&entry("l1", false, false))), LectureState::Failed);
        assert_eq!(lecture_state(Some(&entry("l1", true, true))), LectureState::Completed);
    }

    #[test]
    fn first_lecture_is_always_unlocked() {
        let lectures = vec![
            ("l1".to_string(), LectureKind::Reading),
            ("l2".to_string(), LectureKind::Quiz),
        ];
        assert!(is_unlocked(0, &lectures, &[]));
        assert!(!is_unlocked(1, &lectures, &[]));
    }

    #[test]
    fn reading_predecessor_unlocks_on_completion_alone() {
        let lectures = vec![
            ("l1".to_string(), LectureKind::Reading),
            ("l2".to_string(), LectureKind::Quiz),
        ];
        let entries = vec![entry("l1", true, true)];
        assert!(is_unlocked(1, &lectures, &entries));
    }

    #[test]
    fn quiz_predecessor_requires_pass() {
        let lectures = vec![
            ("q1".to_string(), LectureKind::Quiz),
            ("r2".to_string(), LectureKind::Reading),
        ];

        let failed = vec![entry("q1", false, false)];
        assert!(!is_unlocked(1, &lectures, &failed));

        let passed = vec![entry("q1", true, true)];
        assert!(is_unlocked(1, &lectures, &passed));
    }

    #[test]
    fn started_predecessor_does_not_unlock() {
        let lectures = vec![
            ("l1".to_string(), LectureKind::Reading),
            ("l2".to_string(), LectureKind::Reading),
        ];
        let entries = vec![entry("l1", false, true)];
        assert!(!is_unlocked(1, &lectures, &entries));
    }

    #[test]
    fn summary_rounds_percentage() {
        let entries = vec![entry("l1", true, true), entry("l2", false, false)];
        let summary = course_summary(3, &entries);
        assert_eq!(summary.total_lectures, 3);
        assert_eq!(summary.completed_lectures, 1);
        assert_eq!(summary.progress_percentage, 33);
    }

    #[test]
    fn summary_of_empty_course_is_zero() {
        let summary = course_summary(0, &[]);
        assert_eq!(summary.progress_percentage, 0);
    }

    // The full reading-then-quiz walkthrough: enroll, finish the reading,
    // fail the quiz at 1/2, retry at 2/2.
    #[test]
    fn reading_quiz_retry_walkthrough() {
        let lectures = vec![
            ("r1".to_string(), LectureKind::Reading),
            ("q2".to_string(), LectureKind::Quiz),
        ];

        // Freshly enrolled: no entries at all.
        assert_eq!(unlocked_flags(&lectures, &[]), vec![true, false]);

        // Reading completed.
        let reading = grade(LectureKind::Reading, LectureOutcome::Reading).unwrap();
        let mut entries = vec![entry("r1", reading.is_completed, reading.is_passed)];
        assert_eq!(unlocked_flags(&lectures, &entries), vec![true, true]);

        // Quiz failed at 1/2; it stays unlocked but incomplete.
        let failed = grade(
            LectureKind::Quiz,
            LectureOutcome::Quiz { correct_answers: 1, total_questions: 2 },
        )
        .unwrap();
        entries.push(entry("q2", failed.is_completed, failed.is_passed));
        assert_eq!(unlocked_flags(&lectures, &entries), vec![true, true]);
        assert_eq!(course_summary(2, &entries).progress_percentage, 50);

        // Retry at 2/2 overwrites the failed attempt.
        let passed = grade(
            LectureKind::Quiz,
            LectureOutcome::Quiz { correct_answers: 2, total_questions: 2 },
        )
        .unwrap();
        entries[1] = entry("q2", passed.is_completed, passed.is_passed);
        assert_eq!(course_summary(2, &entries).progress_percentage, 100);
        assert_eq!(lecture_state(Some(&entries[1])), LectureState::Completed);
    }
}
