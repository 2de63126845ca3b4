use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::{GradingStatus, QuestionKind};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuestionUpsert {
    /// Present for an existing question, absent for a new one. An id that no
    /// longer matches a stored question is discarded and the entry is
    /// created fresh.
    #[serde(default)]
    pub id: Option<String>,
    #[validate(range(min = 1, message = "number must be positive"))]
    pub number: i32,
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    pub kind: QuestionKind,
    #[validate(range(min = 0, message = "score must be non-negative"))]
    pub score: i32,
    #[serde(default)]
    pub choices: Option<HashMap<String, String>>,
    #[validate(length(min = 1, message = "answer must not be empty"))]
    pub answer: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExamCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[serde(alias = "passScore")]
    #[validate(range(min = 0, message = "pass_score must be non-negative"))]
    pub pass_score: i32,
    #[serde(default)]
    pub note: Option<String>,
    #[validate(nested)]
    pub questions: Vec<QuestionUpsert>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ExamUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: Option<String>,
    #[serde(default)]
    #[serde(alias = "passScore")]
    #[validate(range(min = 0, message = "pass_score must be non-negative"))]
    pub pass_score: Option<i32>,
    #[serde(default)]
    pub note: Option<String>,
    /// Distinguishes "leave the note alone" (both unset) from "clear it".
    #[serde(default)]
    #[serde(alias = "clearNote")]
    pub clear_note: bool,
    /// Full replacement question list; `None` leaves the question set
    /// untouched, an empty list deletes every remaining question.
    #[serde(default)]
    #[validate(nested)]
    pub questions: Option<Vec<QuestionUpsert>>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub id: String,
    pub exam_id: String,
    pub number: i32,
    pub content: String,
    pub kind: QuestionKind,
    pub score: i32,
    pub choices: Option<HashMap<String, String>>,
    pub answer: String,
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct ExamResponse {
    pub id: String,
    pub lecture_id: String,
    pub title: String,
    pub pass_score: i32,
    pub grading_status: GradingStatus,
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub questions: Vec<QuestionResponse>,
}

#[derive(Debug, Serialize)]
pub struct ExamSummaryResponse {
    pub id: String,
    pub title: String,
    pub pass_score: i32,
    pub grading_status: GradingStatus,
    pub question_count: i64,
    pub created_at: String,
}
