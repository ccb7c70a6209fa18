use sqlx::PgPool;

use crate::db::models::ProgressEntry;
use crate::services::progress::CompletionUpdate;

const COLUMNS: &str = "\
    id, student_id, course_id, lecture_id, is_completed, is_passed, \
    score, correct_answers, total_questions, updated_at";

pub(crate) async fn list_for_pair(
    pool: &PgPool,
    student_id: &str,
    course_id: &str,
) -> Result<Vec<ProgressEntry>, sqlx::Error> {
    sqlx::query_as::<_, ProgressEntry>(&format!(
        "SELECT {COLUMNS}
         FROM progress_entries
         WHERE student_id = $1 AND course_id = $2"
    ))
    .bind(student_id)
    .bind(course_id)
    .fetch_all(pool)
    .await
}

/// Records a lecture as started. Idempotent: a lecture that was already
/// started, completed, or failed is left exactly as it was.
pub(crate) async fn mark_started(
    pool: &PgPool,
    id: &str,
    student_id: &str,
    course_id: &str,
    lecture_id: &str,
    updated_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO progress_entries (
            id, student_id, course_id, lecture_id, is_completed, is_passed, score, updated_at
         ) VALUES ($1,$2,$3,$4,FALSE,TRUE,NULL,$5)
         ON CONFLICT (student_id, course_id, lecture_id) DO NOTHING",
    )
    .bind(id)
    .bind(student_id)
    .bind(course_id)
    .bind(lecture_id)
    .bind(updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Applies a graded completion to the entry, creating it if the student
/// never pressed start. Always an upsert on the (student, course, lecture)
/// key: retries overwrite, they never append.
pub(crate) async fn apply_completion(
    pool: &PgPool,
    id: &str,
    student_id: &str,
    course_id: &str,
    lecture_id: &str,
    update: CompletionUpdate,
    updated_at: time::PrimitiveDateTime,
) -> Result<ProgressEntry, sqlx::Error> {
    sqlx::query_as::<_, ProgressEntry>(&format!(
        "INSERT INTO progress_entries (
            id, student_id, course_id, lecture_id,
            is_completed, is_passed, score, correct_answers, total_questions, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
         ON CONFLICT (student_id, course_id, lecture_id)
         DO UPDATE SET is_completed = EXCLUDED.is_completed,
                       is_passed = EXCLUDED.is_passed,
                       score = COALESCE(EXCLUDED.score, progress_entries.score),
                       correct_answers = COALESCE(EXCLUDED.correct_answers, progress_entries.correct_answers),
                       total_questions = COALESCE(EXCLUDED.total_questions, progress_entries.total_questions),
                       updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(student_id)
    .bind(course_id)
    .bind(lecture_id)
    .bind(update.is_completed)
    .bind(update.is_passed)
    .bind(update.score)
    .bind(update.correct_answers)
    .bind(update.total_questions)
    .bind(updated_at)
    .fetch_one(pool)
    .await
}
