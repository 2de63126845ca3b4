//! Grading submission pipeline. Clients pre-compute correctness and totals
//! for display, but nothing client-claimed is persisted: multiple-choice
//! correctness and both aggregates are recomputed here against the stored
//! question set, and any disagreement rejects the whole submission.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;
use validator::Validate;

use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{Grade, Question};
use crate::db::types::{GradingStatus, QuestionKind};
use crate::repositories;
use crate::schemas::grading::{ExamGradeResponse, GradeResponse, GradingSubmit};
use crate::services::access::{self, Requester};
use crate::services::error::ServiceError;

#[derive(Debug)]
pub(crate) struct VerifiedAnswer {
    pub(crate) question_id: String,
    pub(crate) answer: String,
    pub(crate) is_correct: bool,
}

#[derive(Debug)]
pub(crate) struct VerifiedGrading {
    pub(crate) answers: Vec<VerifiedAnswer>,
    pub(crate) total_score: i32,
    pub(crate) correct_count: i32,
    pub(crate) is_passed: bool,
}

pub async fn submit_grading(
    state: &AppState,
    exam_id: &str,
    payload: GradingSubmit,
    requester: &Requester,
) -> Result<GradeResponse, ServiceError> {
    payload.validate().map_err(|e| ServiceError::validation(e.to_string()))?;

    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch exam"))?;

    let Some(exam) = exam else {
        return Err(ServiceError::NotFound("Exam not found".to_string()));
    };

    if exam.grading_status == GradingStatus::Completed {
        return Err(ServiceError::Conflict(
            "Grading for this exam is already completed".to_string(),
        ));
    }

    access::require_exam_access(state, &exam, requester).await?;

    let enrollment = repositories::enrollments::find_by_id(state.db(), &payload.enrollment_id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch enrollment"))?;

    let Some(enrollment) = enrollment else {
        return Err(ServiceError::NotFound("Enrollment not found".to_string()));
    };

    if enrollment.lecture_id != exam.lecture_id {
        return Err(ServiceError::validation("Enrollment does not belong to this lecture"));
    }

    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch questions"))?;

    let verified = verify_submission(&questions, &payload, exam.pass_score)?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ServiceError::database(e, "Failed to start transaction"))?;

    if exam.grading_status == GradingStatus::Pending {
        repositories::exams::set_grading_status(
            &mut *tx,
            &exam.id,
            GradingStatus::InProgress,
            now,
        )
        .await
        .map_err(|e| ServiceError::database(e, "Failed to advance grading status"))?;
    }

    for answer in &verified.answers {
        let answer_id = Uuid::new_v4().to_string();
        repositories::grades::upsert_answer(
            &mut *tx,
            repositories::grades::UpsertAnswer {
                id: &answer_id,
                enrollment_id: &enrollment.id,
                question_id: &answer.question_id,
                answer: &answer.answer,
                is_correct: answer.is_correct,
                now,
            },
        )
        .await
        .map_err(|e| ServiceError::database(e, "Failed to record answer"))?;
    }

    let grade_id = Uuid::new_v4().to_string();
    let grade = repositories::grades::upsert_grade(
        &mut *tx,
        repositories::grades::UpsertGrade {
            id: &grade_id,
            exam_id: &exam.id,
            enrollment_id: &enrollment.id,
            total_score: verified.total_score,
            is_passed: verified.is_passed,
            now,
        },
    )
    .await
    .map_err(|e| ServiceError::database(e, "Failed to record grade"))?;

    tx.commit().await.map_err(|e| ServiceError::database(e, "Failed to commit transaction"))?;

    tracing::info!(
        exam_id = %exam.id,
        enrollment_id = %enrollment.id,
        total_score = verified.total_score,
        is_passed = verified.is_passed,
        "Grading recorded"
    );

    Ok(grade_to_response(grade))
}

pub async fn grades_by_exam(
    state: &AppState,
    exam_id: &str,
    requester: &Requester,
) -> Result<Vec<ExamGradeResponse>, ServiceError> {
    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch exam"))?;

    let Some(exam) = exam else {
        return Err(ServiceError::NotFound("Exam not found".to_string()));
    };

    access::require_exam_access(state, &exam, requester).await?;

    let rows = repositories::grades::list_by_exam_with_students(state.db(), &exam.id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch grades"))?;

    Ok(rows
        .into_iter()
        .map(|row| ExamGradeResponse {
            id: row.id,
            exam_id: row.exam_id,
            enrollment_id: row.enrollment_id,
            student_id: row.student_id,
            student_name: row.student_name,
            total_score: row.total_score,
            is_passed: row.is_passed,
            updated_at: format_primitive(row.updated_at),
        })
        .collect())
}

/// Finalize grading for an exam. The terminal status is one-way: once
/// completed, further submissions and a second completion are refused.
pub async fn complete_grading(
    state: &AppState,
    exam_id: &str,
    requester: &Requester,
) -> Result<(), ServiceError> {
    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch exam"))?;

    let Some(exam) = exam else {
        return Err(ServiceError::NotFound("Exam not found".to_string()));
    };

    if exam.grading_status == GradingStatus::Completed {
        return Err(ServiceError::Conflict(
            "Grading for this exam is already completed".to_string(),
        ));
    }

    access::require_exam_access(state, &exam, requester).await?;

    let now = primitive_now_utc();
    repositories::exams::set_grading_status(state.db(), &exam.id, GradingStatus::Completed, now)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to complete grading"))?;

    tracing::info!(exam_id = %exam.id, "Grading completed");

    Ok(())
}

/// Recompute the submission from the stored question set and reject on any
/// disagreement with the client's claims.
pub(crate) fn verify_submission(
    questions: &[Question],
    submission: &GradingSubmit,
    pass_score: i32,
) -> Result<VerifiedGrading, ServiceError> {
    let by_id: HashMap<&str, &Question> =
        questions.iter().map(|question| (question.id.as_str(), question)).collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut answers = Vec::with_capacity(submission.answers.len());
    let mut total_score = 0i32;
    let mut correct_count = 0i32;

    for entry in &submission.answers {
        if !seen.insert(entry.question_id.as_str()) {
            return Err(ServiceError::validation(format!(
                "Duplicate answer for question {}",
                entry.question_id
            )));
        }

        let Some(question) = by_id.get(entry.question_id.as_str()) else {
            return Err(ServiceError::validation(format!(
                "Question {} does not belong to this exam",
                entry.question_id
            )));
        };

        let is_correct = match question.kind {
            // Free text cannot be auto-graded; the grader's judgment stands.
            QuestionKind::Essay => entry.is_correct,
            QuestionKind::Multiple => {
                let server_correct = question.answer == entry.answer;
                if server_correct != entry.is_correct {
                    return Err(ServiceError::validation(format!(
                        "Claimed correctness for question {} disagrees with the stored answer",
                        question.number
                    )));
                }
                server_correct
            }
        };

        if is_correct {
            total_score += question.score;
            correct_count += 1;
        }

        answers.push(VerifiedAnswer {
            question_id: question.id.clone(),
            answer: entry.answer.clone(),
            is_correct,
        });
    }

    if total_score != submission.total_score {
        return Err(ServiceError::validation(format!(
            "Claimed total score {} does not match the recomputed total {}",
            submission.total_score, total_score
        )));
    }

    if correct_count != submission.correct_count {
        return Err(ServiceError::validation(format!(
            "Claimed correct count {} does not match the recomputed count {}",
            submission.correct_count, correct_count
        )));
    }

    Ok(VerifiedGrading { answers, total_score, correct_count, is_passed: total_score >= pass_score })
}

pub(crate) fn grade_to_response(grade: Grade) -> GradeResponse {
    GradeResponse {
        id: grade.id,
        exam_id: grade.exam_id,
        enrollment_id: grade.enrollment_id,
        total_score: grade.total_score,
        is_passed: grade.is_passed,
        created_at: format_primitive(grade.created_at),
        updated_at: format_primitive(grade.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{answer_entry, grading_submit, scored_question};

    fn exam_questions() -> Vec<Question> {
        vec![
            scored_question("q1", "exam-1", 1, QuestionKind::Multiple, 30, "1"),
            scored_question("q2", "exam-1", 2, QuestionKind::Multiple, 30, "2"),
            scored_question("q3", "exam-1", 3, QuestionKind::Essay, 40, "free response"),
        ]
    }

    #[test]
    fn valid_submission_is_recomputed_and_accepted() {
        let questions = exam_questions();
        let submission = grading_submit(
            "enr-1",
            vec![
                answer_entry("q1", "1", true),
                answer_entry("q2", "3", false),
                answer_entry("q3", "essay text", true),
            ],
            70,
            2,
        );

        let verified = verify_submission(&questions, &submission, 60).unwrap();

        assert_eq!(verified.total_score, 70);
        assert_eq!(verified.correct_count, 2);
        assert!(verified.is_passed);
        assert_eq!(verified.answers.len(), 3);
    }

    #[test]
    fn duplicate_question_ids_are_rejected() {
        let questions = exam_questions();
        let submission = grading_submit(
            "enr-1",
            vec![answer_entry("q1", "1", true), answer_entry("q1", "1", true)],
            60,
            2,
        );

        let result = verify_submission(&questions, &submission, 60);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn foreign_question_ids_are_rejected() {
        let questions = exam_questions();
        let submission =
            grading_submit("enr-1", vec![answer_entry("q-other", "1", true)], 30, 1);

        let result = verify_submission(&questions, &submission, 60);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn forged_multiple_choice_correctness_is_rejected() {
        let questions = exam_questions();
        // "3" is wrong for q1 but the client claims it correct.
        let submission =
            grading_submit("enr-1", vec![answer_entry("q1", "3", true)], 30, 1);

        let result = verify_submission(&questions, &submission, 60);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn understated_multiple_choice_correctness_is_also_rejected() {
        let questions = exam_questions();
        let submission =
            grading_submit("enr-1", vec![answer_entry("q1", "1", false)], 0, 0);

        let result = verify_submission(&questions, &submission, 60);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn forged_total_score_is_rejected() {
        let questions = exam_questions();
        let submission = grading_submit(
            "enr-1",
            vec![answer_entry("q1", "1", true), answer_entry("q2", "3", false)],
            90,
            1,
        );

        let result = verify_submission(&questions, &submission, 60);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn forged_correct_count_is_rejected() {
        let questions = exam_questions();
        let submission = grading_submit(
            "enr-1",
            vec![answer_entry("q1", "1", true), answer_entry("q2", "3", false)],
            30,
            2,
        );

        let result = verify_submission(&questions, &submission, 60);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn essay_correctness_is_taken_from_the_grader() {
        let questions = exam_questions();
        let rejected = grading_submit("enr-1", vec![answer_entry("q3", "weak essay", false)], 0, 0);
        let verified = verify_submission(&questions, &rejected, 60).unwrap();
        assert_eq!(verified.total_score, 0);
        assert!(!verified.is_passed);

        let accepted = grading_submit("enr-1", vec![answer_entry("q3", "good essay", true)], 40, 1);
        let verified = verify_submission(&questions, &accepted, 60).unwrap();
        assert_eq!(verified.total_score, 40);
    }

    #[test]
    fn pass_is_derived_from_threshold_boundary() {
        let questions = vec![scored_question("q1", "exam-1", 1, QuestionKind::Multiple, 60, "1")];

        let at_threshold =
            grading_submit("enr-1", vec![answer_entry("q1", "1", true)], 60, 1);
        let verified = verify_submission(&questions, &at_threshold, 60).unwrap();
        assert!(verified.is_passed);

        let questions = vec![scored_question("q1", "exam-1", 1, QuestionKind::Multiple, 59, "1")];
        let below =
            grading_submit("enr-1", vec![answer_entry("q1", "1", true)], 59, 1);
        let verified = verify_submission(&questions, &below, 60).unwrap();
        assert!(!verified.is_passed);
    }

    #[test]
    fn empty_answer_list_verifies_to_zero() {
        let questions = exam_questions();
        let submission = grading_submit("enr-1", Vec::new(), 0, 0);

        let verified = verify_submission(&questions, &submission, 60).unwrap();
        assert_eq!(verified.total_score, 0);
        assert_eq!(verified.correct_count, 0);
        assert!(!verified.is_passed);
    }
}
