use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Exam;
use crate::db::types::GradingStatus;

pub(crate) const COLUMNS: &str = "\
    id, lecture_id, title, pass_score, grading_status, note, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamSummaryRow {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) pass_score: i32,
    pub(crate) grading_status: GradingStatus,
    pub(crate) question_count: i64,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) struct CreateExam<'a> {
    pub id: &'a str,
    pub lecture_id: &'a str,
    pub title: &'a str,
    pub pass_score: i32,
    pub grading_status: GradingStatus,
    pub note: Option<&'a str>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug)]
pub(crate) struct UpdateExam {
    pub title: Option<String>,
    pub pass_score: Option<i32>,
    pub note: Option<String>,
    pub clear_note: bool,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateExam<'_>,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (id, lecture_id, title, pass_score, grading_status, note, \
         created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.lecture_id)
    .bind(params.title)
    .bind(params.pass_score)
    .bind(params.grading_status)
    .bind(params.note)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdateExam,
) -> Result<(), sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("UPDATE exams SET updated_at = ");
    builder.push_bind(params.updated_at);

    if let Some(title) = params.title {
        builder.push(", title = ");
        builder.push_bind(title);
    }

    if let Some(pass_score) = params.pass_score {
        builder.push(", pass_score = ");
        builder.push_bind(pass_score);
    }

    if params.clear_note {
        builder.push(", note = NULL");
    } else if let Some(note) = params.note {
        builder.push(", note = ");
        builder.push_bind(note);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(executor).await?;
    Ok(())
}

pub(crate) async fn set_grading_status(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: GradingStatus,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE exams SET grading_status = $1, updated_at = $2 WHERE id = $3")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn list_summaries_by_lecture(
    pool: &PgPool,
    lecture_id: &str,
) -> Result<Vec<ExamSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamSummaryRow>(
        "SELECT e.id,
                e.title,
                e.pass_score,
                e.grading_status,
                COUNT(q.id) AS question_count,
                e.created_at
         FROM exams e
         LEFT JOIN questions q ON q.exam_id = e.id
         WHERE e.lecture_id = $1
         GROUP BY e.id
         ORDER BY e.created_at DESC",
    )
    .bind(lecture_id)
    .fetch_all(pool)
    .await
}
