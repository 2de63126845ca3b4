use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnswerSubmit {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub question_id: String,
    pub answer: String,
    /// Client-side correctness judgment. Authoritative for essay questions
    /// only; for multiple-choice it must agree with the server's own check.
    #[serde(alias = "isCorrect")]
    pub is_correct: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GradingSubmit {
    #[serde(alias = "enrollmentId")]
    #[validate(length(min = 1, message = "enrollment_id must not be empty"))]
    pub enrollment_id: String,
    #[validate(nested)]
    pub answers: Vec<AnswerSubmit>,
    #[serde(alias = "totalScore")]
    #[validate(range(min = 0, message = "total_score must be non-negative"))]
    pub total_score: i32,
    #[serde(alias = "correctCount")]
    #[validate(range(min = 0, message = "correct_count must be non-negative"))]
    pub correct_count: i32,
}

#[derive(Debug, Serialize)]
pub struct GradeResponse {
    pub id: String,
    pub exam_id: String,
    pub enrollment_id: String,
    pub total_score: i32,
    pub is_passed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct ExamGradeResponse {
    pub id: String,
    pub exam_id: String,
    pub enrollment_id: String,
    pub student_id: String,
    pub student_name: String,
    pub total_score: i32,
    pub is_passed: bool,
    pub updated_at: String,
}
