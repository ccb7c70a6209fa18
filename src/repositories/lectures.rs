use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::models::{AnswerOption, Lecture, Question};
use crate::db::types::LectureKind;
use crate::services::ordering;

pub(crate) const COLUMNS: &str =
    "id, course_id, title, kind, content, order_index, created_at, updated_at";

const QUESTION_COLUMNS: &str = "id, lecture_id, position, text, options, created_at";

pub(crate) struct CreateLecture<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) kind: LectureKind,
    pub(crate) content: &'a str,
    pub(crate) questions: Vec<NewQuestion>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) struct NewQuestion {
    pub(crate) text: String,
    pub(crate) options: Vec<AnswerOption>,
}

/// Appends the lecture at the end of the course order and inserts its
/// questions, all in one transaction. The order is derived from the current
/// count inside the same transaction so two concurrent creates cannot claim
/// the same slot without one failing the unique constraint.
pub(crate) async fn create(pool: &PgPool, params: CreateLecture<'_>) -> Result<Lecture, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lectures WHERE course_id = $1")
        .bind(params.course_id)
        .fetch_one(&mut *tx)
        .await?;

    let lecture = sqlx::query_as::<_, Lecture>(&format!(
        "INSERT INTO lectures (
            id, course_id, title, kind, content, order_index, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.title)
    .bind(params.kind)
    .bind(params.content)
    .bind(ordering::next_order(existing))
    .bind(params.created_at)
    .bind(params.created_at)
    .fetch_one(&mut *tx)
    .await?;

    insert_questions(&mut tx, &lecture.id, params.questions, params.created_at).await?;

    tx.commit().await?;
    Ok(lecture)
}

async fn insert_questions(
    tx: &mut Transaction<'_, Postgres>,
    lecture_id: &str,
    questions: Vec<NewQuestion>,
    created_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    for (position, question) in questions.into_iter().enumerate() {
        sqlx::query(
            "INSERT INTO questions (id, lecture_id, position, text, options, created_at)
             VALUES ($1,$2,$3,$4,$5,$6)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(lecture_id)
        .bind(position as i32 + 1)
        .bind(question.text)
        .bind(sqlx::types::Json(question.options))
        .bind(created_at)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    lecture_id: &str,
) -> Result<Option<Lecture>, sqlx::Error> {
    sqlx::query_as::<_, Lecture>(&format!("SELECT {COLUMNS} FROM lectures WHERE id = $1"))
        .bind(lecture_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_for_course(
    pool: &PgPool,
    course_id: &str,
) -> Result<Vec<Lecture>, sqlx::Error> {
    sqlx::query_as::<_, Lecture>(&format!(
        "SELECT {COLUMNS} FROM lectures WHERE course_id = $1 ORDER BY order_index"
    ))
    .bind(course_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_questions(
    pool: &PgPool,
    lecture_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE lecture_id = $1 ORDER BY position"
    ))
    .bind(lecture_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct UpdateLecture {
    pub(crate) title: Option<String>,
    pub(crate) content: Option<String>,
    /// `Some` replaces the full question set; `None` leaves it untouched.
    pub(crate) questions: Option<Vec<NewQuestion>>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    lecture_id: &str,
    params: UpdateLecture,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE lectures SET
            title = COALESCE($1, title),
            content = COALESCE($2, content),
            updated_at = $3
         WHERE id = $4",
    )
    .bind(params.title)
    .bind(params.content)
    .bind(params.updated_at)
    .bind(lecture_id)
    .execute(&mut *tx)
    .await?;

    if let Some(questions) = params.questions {
        sqlx::query("DELETE FROM questions WHERE lecture_id = $1")
            .bind(lecture_id)
            .execute(&mut *tx)
            .await?;
        insert_questions(&mut tx, lecture_id, questions, params.updated_at).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Deletes the lecture (questions follow via FK cascade) and renumbers the
/// remaining lectures of the course back to contiguous 1-based order.
pub(crate) async fn delete_and_renumber(
    pool: &PgPool,
    lecture_id: &str,
    course_id: &str,
    updated_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM progress_entries WHERE lecture_id = $1")
        .bind(lecture_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM lectures WHERE id = $1")
        .bind(lecture_id)
        .execute(&mut *tx)
        .await?;

    let remaining = sqlx::query_as::<_, (String, i32)>(
        "SELECT id, order_index FROM lectures WHERE course_id = $1 ORDER BY order_index",
    )
    .bind(course_id)
    .fetch_all(&mut *tx)
    .await?;

    for (id, new_order) in ordering::plan_renumbering(&remaining) {
        sqlx::query("UPDATE lectures SET order_index = $1, updated_at = $2 WHERE id = $3")
            .bind(new_order)
            .bind(updated_at)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub(crate) async fn count_for_course(pool: &PgPool, course_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM lectures WHERE course_id = $1")
        .bind(course_id)
        .fetch_one(pool)
        .await
}
