use std::collections::HashMap;

use sqlx::types::Json;
use time::PrimitiveDateTime;

use crate::db::models::Question;
use crate::db::types::QuestionKind;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, number, content, kind, score, choices, answer, note, \
    created_at, updated_at";

pub(crate) struct CreateQuestion<'a> {
    pub id: &'a str,
    pub exam_id: &'a str,
    pub number: i32,
    pub content: &'a str,
    pub kind: QuestionKind,
    pub score: i32,
    pub choices: Option<HashMap<String, String>>,
    pub answer: &'a str,
    pub note: Option<&'a str>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) struct UpdateQuestion<'a> {
    pub number: i32,
    pub content: &'a str,
    pub kind: QuestionKind,
    pub score: i32,
    pub choices: Option<HashMap<String, String>>,
    pub answer: &'a str,
    pub note: Option<&'a str>,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn list_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY number"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO questions (id, exam_id, number, content, kind, score, choices, answer, \
         note, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.number)
    .bind(params.content)
    .bind(params.kind)
    .bind(params.score)
    .bind(params.choices.map(Json))
    .bind(params.answer)
    .bind(params.note)
    .bind(params.created_at)
    .bind(params.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Full field replacement; the reconciliation path never merges partially.
pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdateQuestion<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE questions
         SET number = $1, content = $2, kind = $3, score = $4, choices = $5, answer = $6, \
             note = $7, updated_at = $8
         WHERE id = $9",
    )
    .bind(params.number)
    .bind(params.content)
    .bind(params.kind)
    .bind(params.score)
    .bind(params.choices.map(Json))
    .bind(params.answer)
    .bind(params.note)
    .bind(params.updated_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn delete_by_ids(
    executor: impl sqlx::PgExecutor<'_>,
    ids: &[String],
) -> Result<(), sqlx::Error> {
    if ids.is_empty() {
        return Ok(());
    }

    sqlx::query("DELETE FROM questions WHERE id = ANY($1)")
        .bind(ids)
        .execute(executor)
        .await?;
    Ok(())
}
