//! Exam aggregate lifecycle: creation of an exam with its question set, and
//! the reconciliation-based edit path that diffs an incoming full
//! replacement list against the stored questions.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;
use validator::Validate;

use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{Exam, Question};
use crate::db::types::{GradingStatus, QuestionKind};
use crate::repositories;
use crate::schemas::exam::{
    ExamCreate, ExamResponse, ExamSummaryResponse, ExamUpdate, QuestionResponse, QuestionUpsert,
};
use crate::services::access::{self, Requester};
use crate::services::error::ServiceError;

pub async fn create_exam(
    state: &AppState,
    lecture_id: &str,
    payload: ExamCreate,
    requester: &Requester,
) -> Result<ExamResponse, ServiceError> {
    payload.validate().map_err(|e| ServiceError::validation(e.to_string()))?;

    if payload.questions.is_empty() {
        return Err(ServiceError::validation("At least one question is required"));
    }

    let lecture = access::fetch_lecture(state, lecture_id).await?;
    state.access().validate_instructor_access(&lecture.instructor_id, requester).await?;

    validate_question_definitions(&payload.questions)?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ServiceError::database(e, "Failed to start transaction"))?;

    let exam_id = Uuid::new_v4().to_string();
    let exam = repositories::exams::create(
        &mut *tx,
        repositories::exams::CreateExam {
            id: &exam_id,
            lecture_id: &lecture.id,
            title: &payload.title,
            pass_score: payload.pass_score,
            grading_status: GradingStatus::Pending,
            note: payload.note.as_deref(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ServiceError::database(e, "Failed to create exam"))?;

    for entry in &payload.questions {
        insert_question(&mut tx, &exam_id, entry).await?;
    }

    let questions = repositories::questions::list_by_exam(&mut *tx, &exam_id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch created questions"))?;

    tx.commit().await.map_err(|e| ServiceError::database(e, "Failed to commit transaction"))?;

    tracing::info!(
        lecture_id = %lecture.id,
        exam_id = %exam.id,
        question_count = questions.len(),
        "Exam created"
    );

    Ok(exam_to_response(exam, questions))
}

pub async fn update_exam(
    state: &AppState,
    exam_id: &str,
    payload: ExamUpdate,
    requester: &Requester,
) -> Result<ExamResponse, ServiceError> {
    payload.validate().map_err(|e| ServiceError::validation(e.to_string()))?;

    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch exam"))?;

    let Some(exam) = exam else {
        return Err(ServiceError::NotFound("Exam not found".to_string()));
    };

    access::require_exam_access(state, &exam, requester).await?;

    if let Some(questions) = &payload.questions {
        validate_question_definitions(questions)?;
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ServiceError::database(e, "Failed to start transaction"))?;

    repositories::exams::update(
        &mut *tx,
        &exam.id,
        repositories::exams::UpdateExam {
            title: payload.title,
            pass_score: payload.pass_score,
            note: payload.note,
            clear_note: payload.clear_note,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ServiceError::database(e, "Failed to update exam"))?;

    if let Some(incoming) = payload.questions {
        let existing = repositories::questions::list_by_exam(&mut *tx, &exam.id)
            .await
            .map_err(|e| ServiceError::database(e, "Failed to fetch questions"))?;

        let plan = plan_question_changes(&existing, incoming);

        repositories::questions::delete_by_ids(&mut *tx, &plan.delete_ids)
            .await
            .map_err(|e| ServiceError::database(e, "Failed to delete removed questions"))?;

        for (question_id, entry) in &plan.updates {
            repositories::questions::update(
                &mut *tx,
                question_id,
                repositories::questions::UpdateQuestion {
                    number: entry.number,
                    content: &entry.content,
                    kind: entry.kind,
                    score: entry.score,
                    choices: effective_choices(entry),
                    answer: &entry.answer,
                    note: entry.note.as_deref(),
                    updated_at: now,
                },
            )
            .await
            .map_err(|e| ServiceError::database(e, "Failed to update question"))?;
        }

        for entry in &plan.creates {
            insert_question(&mut tx, &exam.id, entry).await?;
        }
    }

    let updated = repositories::exams::fetch_one_by_id(&mut *tx, &exam.id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch updated exam"))?;
    let questions = repositories::questions::list_by_exam(&mut *tx, &exam.id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to fetch questions"))?;

    tx.commit().await.map_err(|e| ServiceError::database(e, "Failed to commit transaction"))?;

    tracing::info!(
        exam_id = %updated.id,
        question_count = questions.len(),
        "Exam updated"
    );

    Ok(exam_to_response(updated, questions))
}

pub async fn exam_by_id(
    state: &AppState,
    exam_id: &str,
    requester: &Requester,
) -> Result<ExamResponse, ServiceError> {
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

    Ok(exam_to_response(exam, questions))
}

pub async fn exams_by_lecture(
    state: &AppState,
    lecture_id: &str,
    requester: &Requester,
) -> Result<Vec<ExamSummaryResponse>, ServiceError> {
    let lecture = access::fetch_lecture(state, lecture_id).await?;
    state.access().validate_instructor_access(&lecture.instructor_id, requester).await?;

    let summaries = repositories::exams::list_summaries_by_lecture(state.db(), &lecture.id)
        .await
        .map_err(|e| ServiceError::database(e, "Failed to list exams"))?;

    Ok(summaries
        .into_iter()
        .map(|row| ExamSummaryResponse {
            id: row.id,
            title: row.title,
            pass_score: row.pass_score,
            grading_status: row.grading_status,
            question_count: row.question_count,
            created_at: format_primitive(row.created_at),
        })
        .collect())
}

#[derive(Debug)]
pub(crate) struct QuestionChangePlan {
    pub(crate) delete_ids: Vec<String>,
    pub(crate) updates: Vec<(String, QuestionUpsert)>,
    pub(crate) creates: Vec<QuestionUpsert>,
}

/// Diff the incoming full replacement list against the stored set. Entries
/// carrying a known id update in place, entries without one are created,
/// and stored questions missing from the list are deleted. An id that
/// matches nothing is discarded and the entry is created fresh.
pub(crate) fn plan_question_changes(
    existing: &[Question],
    incoming: Vec<QuestionUpsert>,
) -> QuestionChangePlan {
    let existing_ids: HashSet<&str> = existing.iter().map(|q| q.id.as_str()).collect();

    let mut kept: HashSet<String> = HashSet::new();
    let mut updates = Vec::new();
    let mut creates = Vec::new();

    for entry in incoming {
        match entry.id.as_deref() {
            Some(id) if existing_ids.contains(id) => {
                let id = id.to_string();
                kept.insert(id.clone());
                updates.push((id, entry));
            }
            _ => creates.push(entry),
        }
    }

    let delete_ids = existing
        .iter()
        .filter(|question| !kept.contains(&question.id))
        .map(|question| question.id.clone())
        .collect();

    QuestionChangePlan { delete_ids, updates, creates }
}

pub(crate) fn validate_question_definitions(
    questions: &[QuestionUpsert],
) -> Result<(), ServiceError> {
    let mut numbers = HashSet::new();
    let mut ids = HashSet::new();

    for entry in questions {
        if !numbers.insert(entry.number) {
            return Err(ServiceError::validation(format!(
                "Duplicate question number {}",
                entry.number
            )));
        }

        if let Some(id) = &entry.id {
            if !ids.insert(id.as_str()) {
                return Err(ServiceError::validation(format!("Duplicate question id {id}")));
            }
        }

        match entry.kind {
            QuestionKind::Multiple => {
                let choices = entry
                    .choices
                    .as_ref()
                    .filter(|choices| !choices.is_empty())
                    .ok_or_else(|| {
                        ServiceError::validation(format!(
                            "Question {} must provide choices",
                            entry.number
                        ))
                    })?;

                if !choices.contains_key(&entry.answer) {
                    return Err(ServiceError::validation(format!(
                        "Answer for question {} is not one of its choices",
                        entry.number
                    )));
                }
            }
            QuestionKind::Essay => {}
        }
    }

    Ok(())
}

/// Essay questions never store a choice map, whatever the client sent.
fn effective_choices(entry: &QuestionUpsert) -> Option<HashMap<String, String>> {
    match entry.kind {
        QuestionKind::Multiple => entry.choices.clone(),
        QuestionKind::Essay => None,
    }
}

async fn insert_question(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    exam_id: &str,
    entry: &QuestionUpsert,
) -> Result<(), ServiceError> {
    let now = primitive_now_utc();
    let question_id = Uuid::new_v4().to_string();

    repositories::questions::create(
        &mut **tx,
        repositories::questions::CreateQuestion {
            id: &question_id,
            exam_id,
            number: entry.number,
            content: &entry.content,
            kind: entry.kind,
            score: entry.score,
            choices: effective_choices(entry),
            answer: &entry.answer,
            note: entry.note.as_deref(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ServiceError::database(e, "Failed to create question"))
}

pub(crate) fn question_to_response(question: Question) -> QuestionResponse {
    QuestionResponse {
        id: question.id,
        exam_id: question.exam_id,
        number: question.number,
        content: question.content,
        kind: question.kind,
        score: question.score,
        choices: question.choices.map(|choices| choices.0),
        answer: question.answer,
        note: question.note,
        created_at: format_primitive(question.created_at),
        updated_at: format_primitive(question.updated_at),
    }
}

pub(crate) fn exam_to_response(exam: Exam, questions: Vec<Question>) -> ExamResponse {
    ExamResponse {
        id: exam.id,
        lecture_id: exam.lecture_id,
        title: exam.title,
        pass_score: exam.pass_score,
        grading_status: exam.grading_status,
        note: exam.note,
        created_at: format_primitive(exam.created_at),
        updated_at: format_primitive(exam.updated_at),
        questions: questions.into_iter().map(question_to_response).collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::access::ActorRole;
    use crate::test_support::{
        lecture, multiple_choices, question, test_state, upsert_entry, FakeAccess, FakeLectures,
    };

    fn create_payload() -> ExamCreate {
        ExamCreate {
            title: "Midterm".to_string(),
            pass_score: 60,
            note: None,
            questions: vec![upsert_entry(None, 1, QuestionKind::Essay)],
        }
    }

    #[tokio::test]
    async fn create_exam_requires_an_existing_lecture() {
        let state =
            test_state(Arc::new(FakeAccess { allow: true }), Arc::new(FakeLectures { lecture: None }));
        let requester = Requester::new(ActorRole::Instructor, "inst-1");

        let result = create_exam(&state, "lec-missing", create_payload(), &requester).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_exam_is_denied_without_lecture_ownership() {
        let state = test_state(
            Arc::new(FakeAccess { allow: false }),
            Arc::new(FakeLectures { lecture: Some(lecture("lec-1", "inst-1")) }),
        );
        let requester = Requester::new(ActorRole::Student, "stu-1");

        let result = create_exam(&state, "lec-1", create_payload(), &requester).await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[test]
    fn resubmitting_current_questions_changes_nothing_structurally() {
        let existing = vec![
            question("q1", "exam-1", 1, QuestionKind::Multiple),
            question("q2", "exam-1", 2, QuestionKind::Essay),
        ];
        let incoming = vec![
            upsert_entry(Some("q1"), 1, QuestionKind::Multiple),
            upsert_entry(Some("q2"), 2, QuestionKind::Essay),
        ];

        let plan = plan_question_changes(&existing, incoming);

        assert!(plan.delete_ids.is_empty());
        assert!(plan.creates.is_empty());
        assert_eq!(plan.updates.len(), 2);
    }

    #[test]
    fn unlisted_questions_are_deleted_and_idless_entries_created() {
        let existing = vec![
            question("q1", "exam-1", 1, QuestionKind::Multiple),
            question("q2", "exam-1", 2, QuestionKind::Multiple),
            question("q3", "exam-1", 3, QuestionKind::Essay),
        ];
        let incoming = vec![
            upsert_entry(Some("q1"), 1, QuestionKind::Multiple),
            upsert_entry(None, 2, QuestionKind::Essay),
        ];

        let plan = plan_question_changes(&existing, incoming);

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].0, "q1");
        assert_eq!(plan.creates.len(), 1);
        let mut deleted = plan.delete_ids.clone();
        deleted.sort();
        assert_eq!(deleted, vec!["q2".to_string(), "q3".to_string()]);

        // Final set: one update + one create = 2 questions.
        assert_eq!(plan.updates.len() + plan.creates.len(), 2);
    }

    #[test]
    fn stale_id_is_discarded_and_treated_as_create() {
        let existing = vec![question("q1", "exam-1", 1, QuestionKind::Essay)];
        let incoming = vec![
            upsert_entry(Some("q1"), 1, QuestionKind::Essay),
            upsert_entry(Some("q-gone"), 2, QuestionKind::Essay),
        ];

        let plan = plan_question_changes(&existing, incoming);

        assert!(plan.delete_ids.is_empty());
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].id.as_deref(), Some("q-gone"));
    }

    #[test]
    fn empty_incoming_list_deletes_every_question() {
        let existing = vec![
            question("q1", "exam-1", 1, QuestionKind::Multiple),
            question("q2", "exam-1", 2, QuestionKind::Essay),
        ];

        let plan = plan_question_changes(&existing, Vec::new());

        let mut deleted = plan.delete_ids.clone();
        deleted.sort();
        assert_eq!(deleted, vec!["q1".to_string(), "q2".to_string()]);
        assert!(plan.updates.is_empty());
        assert!(plan.creates.is_empty());
    }

    #[test]
    fn duplicate_numbers_are_rejected() {
        let entries = vec![
            upsert_entry(None, 1, QuestionKind::Essay),
            upsert_entry(None, 1, QuestionKind::Essay),
        ];

        let result = validate_question_definitions(&entries);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let entries = vec![
            upsert_entry(Some("q1"), 1, QuestionKind::Essay),
            upsert_entry(Some("q1"), 2, QuestionKind::Essay),
        ];

        let result = validate_question_definitions(&entries);
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn multiple_answer_must_be_a_choice_label() {
        let mut entry = upsert_entry(None, 1, QuestionKind::Multiple);
        entry.choices = Some(multiple_choices(&[("1", "Seoul"), ("2", "Busan")]));
        entry.answer = "3".to_string();

        let result = validate_question_definitions(std::slice::from_ref(&entry));
        assert!(matches!(result, Err(ServiceError::Validation(_))));

        entry.answer = "2".to_string();
        validate_question_definitions(std::slice::from_ref(&entry)).unwrap();
    }

    #[test]
    fn multiple_without_choices_is_rejected() {
        let mut entry = upsert_entry(None, 1, QuestionKind::Multiple);
        entry.choices = None;

        let result = validate_question_definitions(std::slice::from_ref(&entry));
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn essay_entries_never_persist_choices() {
        let mut entry = upsert_entry(None, 1, QuestionKind::Essay);
        entry.choices = Some(multiple_choices(&[("1", "ignored")]));

        assert!(effective_choices(&entry).is_none());
    }
}
