use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{GradingStatus, QuestionKind};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lecture {
    pub id: String,
    pub instructor_id: String,
    pub title: String,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: String,
    pub lecture_id: String,
    pub student_id: String,
    pub created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exam {
    pub id: String,
    pub lecture_id: String,
    pub title: String,
    pub pass_score: i32,
    pub grading_status: GradingStatus,
    pub note: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: String,
    pub exam_id: String,
    pub number: i32,
    pub content: String,
    pub kind: QuestionKind,
    pub score: i32,
    pub choices: Option<Json<HashMap<String, String>>>,
    pub answer: String,
    pub note: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentAnswer {
    pub id: String,
    pub enrollment_id: String,
    pub question_id: String,
    pub answer: String,
    pub is_correct: bool,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Grade {
    pub id: String,
    pub exam_id: String,
    pub enrollment_id: String,
    pub total_score: i32,
    pub is_passed: bool,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionStatistic {
    pub id: String,
    pub exam_id: String,
    pub question_id: String,
    pub submission_count: i64,
    pub correct_rate: f64,
    pub choice_rates: Option<Json<HashMap<String, f64>>>,
    pub updated_at: PrimitiveDateTime,
}
