use sqlx::PgPool;

pub(crate) async fn find_instructor_of_assistant(
    pool: &PgPool,
    assistant_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT instructor_id FROM assistants WHERE id = $1")
        .bind(assistant_id)
        .fetch_optional(pool)
        .await
}
