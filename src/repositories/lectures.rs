use sqlx::PgPool;

use crate::db::models::Lecture;

const COLUMNS: &str = "id, instructor_id, title, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Lecture>, sqlx::Error> {
    sqlx::query_as::<_, Lecture>(&format!("SELECT {COLUMNS} FROM lectures WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}
