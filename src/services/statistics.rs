//! Per-question aggregate statistics: correctness rate over the graded
//! population and, for multiple-choice questions, how the selections
//! distribute across choice labels. Recomputed wholesale on demand and
//! cached in `question_statistics`.

use std::collections::HashMap;

use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{Question, QuestionStatistic, StudentAnswer};
use crate::db::types::QuestionKind;
use crate::repositories;
use crate::schemas::statistics::QuestionStatisticResponse;
use crate::services::access::{self, Requester};
use crate::services::error::ServiceError;

#[derive(Debug, PartialEq)]
pub(crate) struct StatisticDraft {
    pub(crate) submission_count: i64,
    pub(crate) correct_rate: f64,
    pub(crate) choice_rates: Option<HashMap<String, f64>>,
}

pub async fn calculate_and_save_statistics(
    state: &AppState,
    exam_id: &str,
    requester: &Requester,
) -> Result<Vec<QuestionStatisticResponse>, ServiceError> {
    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch exam"))?;

    let Some(exam) = exam else {
        return Err(ServiceError::NotFound("Exam not found".to_string()));
    };

    access::require_exam_access(state, &exam, requester).await?;

    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch questions"))?;

    if questions.is_empty() {
        return Ok(Vec::new());
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ServiceError::database(e, "Failed to start transaction"))?;

    let graded_count = repositories::grades::count_by_exam(&mut *tx, &exam.id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to count grades"))?;

    let mut saved = Vec::with_capacity(questions.len());
    for question in &questions {
        let answers = repositories::grades::list_answers_by_question(&mut *tx, &question.id)
            .await
            .map_err(|e| ServiceError::database(e, "Failed to fetch answers"))?;

        let draft = build_question_statistic(question, &answers, graded_count);

        let statistic_id = Uuid::new_v4().to_string();
        let row = repositories::statistics::upsert(
            &mut *tx,
            repositories::statistics::UpsertStatistic {
                id: &statistic_id,
                exam_id: &exam.id,
                question_id: &question.id,
                submission_count: draft.submission_count,
                correct_rate: draft.correct_rate,
                choice_rates: draft.choice_rates,
                updated_at: now,
            },
        )
        .await
        .map_err(|e| ServiceError::database(e, "Failed to save statistic"))?;

        saved.push(row);
    }

    tx.commit().await.map_err(|e| ServiceError::database(e, "Failed to commit transaction"))?;

    tracing::info!(
        exam_id = %exam.id,
        question_count = saved.len(),
        graded_count,
        "Statistics recomputed"
    );

    Ok(saved.into_iter().map(statistic_to_response).collect())
}

/// Cached read; does not recompute.
pub async fn statistics_by_exam(
    state: &AppState,
    exam_id: &str,
    requester: &Requester,
) -> Result<Vec<QuestionStatisticResponse>, ServiceError> {
    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch exam"))?;

    let Some(exam) = exam else {
        return Err(ServiceError::NotFound("Exam not found".to_string()));
    };

    access::require_exam_access(state, &exam, requester).await?;

    let rows = repositories::statistics::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch statistics"))?;

    Ok(rows.into_iter().map(statistic_to_response).collect())
}

/// The denominator is the graded population, not the answer count: a graded
/// student who skipped this question still counts against it.
pub(crate) fn build_question_statistic(
    question: &Question,
    answers: &[StudentAnswer],
    graded_count: i64,
) -> StatisticDraft {
    let correct = answers.iter().filter(|answer| answer.is_correct).count();
    let correct_rate = percentage(correct as i64, graded_count);

    let choice_rates = match question.kind {
        QuestionKind::Essay => None,
        QuestionKind::Multiple => {
            // Tallied from submitted answers only: a label nobody picked is
            // absent from the map rather than reported as 0%.
            let mut counts: HashMap<&str, i64> = HashMap::new();
            for answer in answers {
                *counts.entry(answer.answer.as_str()).or_insert(0) += 1;
            }

            Some(
                counts
                    .into_iter()
                    .map(|(label, count)| (label.to_string(), percentage(count, graded_count)))
                    .collect(),
            )
        }
    };

    StatisticDraft { submission_count: graded_count, correct_rate, choice_rates }
}

fn percentage(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let rate = numerator as f64 / denominator as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

pub(crate) fn statistic_to_response(row: QuestionStatistic) -> QuestionStatisticResponse {
    QuestionStatisticResponse {
        id: row.id,
        exam_id: row.exam_id,
        question_id: row.question_id,
        submission_count: row.submission_count,
        correct_rate: row.correct_rate,
        choice_rates: row.choice_rates.map(|rates| rates.0),
        updated_at: format_primitive(row.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{question, stored_answer};

    #[test]
    fn zero_graded_students_yields_zero_rates() {
        let question = question("q1", "exam-1", 1, QuestionKind::Multiple);

        let draft = build_question_statistic(&question, &[], 0);

        assert_eq!(draft.submission_count, 0);
        assert_eq!(draft.correct_rate, 0.0);
        assert_eq!(draft.choice_rates, Some(HashMap::new()));
    }

    #[test]
    fn unselected_choices_are_omitted_not_zero() {
        let question = question("q1", "exam-1", 1, QuestionKind::Multiple);
        let answers = vec![
            stored_answer("enr-1", "q1", "1", true),
            stored_answer("enr-2", "q1", "1", true),
            stored_answer("enr-3", "q1", "2", false),
        ];

        let draft = build_question_statistic(&question, &answers, 3);

        let rates = draft.choice_rates.unwrap();
        assert_eq!(rates.get("1"), Some(&66.67));
        assert_eq!(rates.get("2"), Some(&33.33));
        assert!(!rates.contains_key("3"));
    }

    #[test]
    fn skipped_questions_still_count_in_the_denominator() {
        let question = question("q1", "exam-1", 1, QuestionKind::Multiple);
        // Four students graded, only one answered this question correctly.
        let answers = vec![stored_answer("enr-1", "q1", "1", true)];

        let draft = build_question_statistic(&question, &answers, 4);

        assert_eq!(draft.submission_count, 4);
        assert_eq!(draft.correct_rate, 25.0);
    }

    #[test]
    fn rates_are_rounded_to_two_decimals() {
        let question = question("q1", "exam-1", 1, QuestionKind::Essay);
        let answers = vec![stored_answer("enr-1", "q1", "text", true)];

        let draft = build_question_statistic(&question, &answers, 3);

        assert_eq!(draft.correct_rate, 33.33);
    }

    #[test]
    fn essay_questions_carry_no_choice_rates() {
        let question = question("q1", "exam-1", 1, QuestionKind::Essay);
        let answers = vec![stored_answer("enr-1", "q1", "text", true)];

        let draft = build_question_statistic(&question, &answers, 1);

        assert!(draft.choice_rates.is_none());
        assert_eq!(draft.correct_rate, 100.0);
    }
}
