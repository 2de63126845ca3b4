use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct QuestionStatisticResponse {
    pub id: String,
    pub exam_id: String,
    pub question_id: String,
    pub submission_count: i64,
    pub correct_rate: f64,
    /// Absent for essay questions. Labels never chosen by any student do
    /// not appear at all; they are not reported as 0%.
    pub choice_rates: Option<HashMap<String, f64>>,
    pub updated_at: String,
}
