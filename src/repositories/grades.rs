use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{Grade, StudentAnswer};

pub(crate) const COLUMNS: &str = "\
    id, exam_id, enrollment_id, total_score, is_passed, created_at, updated_at";

pub(crate) const ANSWER_COLUMNS: &str = "\
    id, enrollment_id, question_id, answer, is_correct, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct GradeWithStudentRow {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) enrollment_id: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) total_score: i32,
    pub(crate) is_passed: bool,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) struct UpsertGrade<'a> {
    pub id: &'a str,
    pub exam_id: &'a str,
    pub enrollment_id: &'a str,
    pub total_score: i32,
    pub is_passed: bool,
    pub now: PrimitiveDateTime,
}

pub(crate) struct UpsertAnswer<'a> {
    pub id: &'a str,
    pub enrollment_id: &'a str,
    pub question_id: &'a str,
    pub answer: &'a str,
    pub is_correct: bool,
    pub now: PrimitiveDateTime,
}

/// Keyed on (exam, enrollment); a repeated submission overwrites in place.
pub(crate) async fn upsert_grade(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertGrade<'_>,
) -> Result<Grade, sqlx::Error> {
    sqlx::query_as::<_, Grade>(&format!(
        "INSERT INTO grades (id, exam_id, enrollment_id, total_score, is_passed, created_at, \
         updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)
         ON CONFLICT (exam_id, enrollment_id) DO UPDATE
         SET total_score = EXCLUDED.total_score,
             is_passed = EXCLUDED.is_passed,
             updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.enrollment_id)
    .bind(params.total_score)
    .bind(params.is_passed)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn upsert_answer(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertAnswer<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO student_answers (id, enrollment_id, question_id, answer, is_correct, \
         created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)
         ON CONFLICT (enrollment_id, question_id) DO UPDATE
         SET answer = EXCLUDED.answer,
             is_correct = EXCLUDED.is_correct,
             updated_at = EXCLUDED.updated_at",
    )
    .bind(params.id)
    .bind(params.enrollment_id)
    .bind(params.question_id)
    .bind(params.answer)
    .bind(params.is_correct)
    .bind(params.now)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn count_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM grades WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn list_by_exam_with_students(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<GradeWithStudentRow>, sqlx::Error> {
    sqlx::query_as::<_, GradeWithStudentRow>(
        "SELECT g.id,
                g.exam_id,
                g.enrollment_id,
                e.student_id,
                s.full_name AS student_name,
                g.total_score,
                g.is_passed,
                g.updated_at
         FROM grades g
         JOIN enrollments e ON e.id = g.enrollment_id
         JOIN students s ON s.id = e.student_id
         WHERE g.exam_id = $1
         ORDER BY g.total_score DESC, s.full_name",
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_answers_by_question(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
) -> Result<Vec<StudentAnswer>, sqlx::Error> {
    sqlx::query_as::<_, StudentAnswer>(&format!(
        "SELECT {ANSWER_COLUMNS} FROM student_answers WHERE question_id = $1"
    ))
    .bind(question_id)
    .fetch_all(executor)
    .await
}
