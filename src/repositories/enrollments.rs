use sqlx::PgPool;

use crate::db::models::{Course, Enrollment};
use crate::repositories::courses;

const COLUMNS: &str = "id, student_id, course_id, enrolled_at";

/// Outcome of an enroll attempt. The unique constraint on
/// (student_id, course_id) is the arbiter, not a prior existence check.
#[derive(Debug)]
pub(crate) enum EnrollOutcome {
    Enrolled(Enrollment),
    AlreadyEnrolled,
}

pub(crate) async fn enroll(
    pool: &PgPool,
    id: &str,
    student_id: &str,
    course_id: &str,
    enrolled_at: time::PrimitiveDateTime,
) -> Result<EnrollOutcome, sqlx::Error> {
    let result = sqlx::query_as::<_, Enrollment>(&format!(
        "INSERT INTO enrollments (id, student_id, course_id, enrolled_at)
         VALUES ($1,$2,$3,$4)
         RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(student_id)
    .bind(course_id)
    .bind(enrolled_at)
    .fetch_one(pool)
    .await;

    match result {
        Ok(enrollment) => Ok(EnrollOutcome::Enrolled(enrollment)),
        Err(err) if is_unique_violation(&err) => Ok(EnrollOutcome::AlreadyEnrolled),
        Err(err) => Err(err),
    }
}

/// Removes the enrollment and the whole progress ledger for the pair in one
/// transaction. Returns false when the student was not enrolled.
pub(crate) async fn unenroll(
    pool: &PgPool,
    student_id: &str,
    course_id: &str,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM enrollments WHERE student_id = $1 AND course_id = $2")
        .bind(student_id)
        .bind(course_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query("DELETE FROM progress_entries WHERE student_id = $1 AND course_id = $2")
        .bind(student_id)
        .bind(course_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

pub(crate) async fn is_enrolled(
    pool: &PgPool,
    student_id: &str,
    course_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<String> = sqlx::query_scalar(
        "SELECT id FROM enrollments WHERE student_id = $1 AND course_id = $2",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

/// Derived view: the courses a student is enrolled in, newest first.
pub(crate) async fn list_courses_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "SELECT c.{}
         FROM courses c
         JOIN enrollments e ON e.course_id = c.id
         WHERE e.student_id = $1
         ORDER BY e.enrolled_at DESC",
        courses::COLUMNS.replace(", ", ", c."),
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

/// Derived view: ids of the students enrolled in a course.
pub(crate) async fn list_student_ids_for_course(
    pool: &PgPool,
    course_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT student_id FROM enrollments WHERE course_id = $1 ORDER BY enrolled_at",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_for_course(pool: &PgPool, course_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
        .bind(course_id)
        .fetch_one(pool)
        .await
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.code().as_deref() == Some("23505"),
        _ => false,
    }
}
