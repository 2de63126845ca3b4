use std::collections::HashMap;

use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::QuestionStatistic;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, question_id, submission_count, correct_rate, choice_rates, updated_at";

pub(crate) struct UpsertStatistic<'a> {
    pub id: &'a str,
    pub exam_id: &'a str,
    pub question_id: &'a str,
    pub submission_count: i64,
    pub correct_rate: f64,
    pub choice_rates: Option<HashMap<String, f64>>,
    pub updated_at: PrimitiveDateTime,
}

/// Keyed on question; recomputation overwrites prior values wholesale.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertStatistic<'_>,
) -> Result<QuestionStatistic, sqlx::Error> {
    sqlx::query_as::<_, QuestionStatistic>(&format!(
        "INSERT INTO question_statistics (id, exam_id, question_id, submission_count, \
         correct_rate, choice_rates, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (question_id) DO UPDATE
         SET submission_count = EXCLUDED.submission_count,
             correct_rate = EXCLUDED.correct_rate,
             choice_rates = EXCLUDED.choice_rates,
             updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.question_id)
    .bind(params.submission_count)
    .bind(params.correct_rate)
    .bind(params.choice_rates.map(Json))
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<QuestionStatistic>, sqlx::Error> {
    sqlx::query_as::<_, QuestionStatistic>(&format!(
        "SELECT {COLUMNS} FROM question_statistics WHERE exam_id = $1 ORDER BY question_id"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}
