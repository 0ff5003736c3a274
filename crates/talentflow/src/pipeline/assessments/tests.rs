use std::collections::BTreeMap;
use std::sync::Arc;

use crate::pipeline::sim::Simulation;
use crate::store::{Store, MIGRATIONS};

use super::domain::{
    Answer, AssessmentPatch, AssessmentStatus, NewAssessment, Question, QuestionKind, Section,
    ShowIf,
};
use super::service::{AssessmentListFilter, AssessmentService, AssessmentServiceError};

fn service() -> AssessmentService {
    let store = Arc::new(Store::open(MIGRATIONS).expect("fresh store opens"));
    AssessmentService::new(store, Simulation::off())
}

fn question(id: &str, kind: QuestionKind) -> Question {
    Question {
        id: id.to_string(),
        kind,
        label: id.to_string(),
        required: false,
        options: Vec::new(),
        min: None,
        max: None,
        show_if: None,
    }
}

fn form() -> Vec<Section> {
    let mut stack = question("stack", QuestionKind::Single);
    stack.required = true;
    stack.options = vec!["rust".to_string(), "go".to_string()];

    let mut years = question("years", QuestionKind::Number);
    years.min = Some(0.0);
    years.max = Some(40.0);

    let mut details = question("details", QuestionKind::Long);
    details.required = true;
    details.show_if = Some(ShowIf {
        question_id: "stack".to_string(),
        equals: "rust".to_string(),
    });

    vec![Section {
        title: "Experience".to_string(),
        questions: vec![stack, years, details],
    }]
}

fn answers(pairs: &[(&str, Answer)]) -> BTreeMap<String, Answer> {
    pairs
        .iter()
        .map(|(id, answer)| (id.to_string(), answer.clone()))
        .collect()
}

#[tokio::test]
async fn create_and_filter_by_status_job_and_candidate() {
    let service = service();
    let pending = service
        .create(NewAssessment {
            candidate_id: 1,
            job_id: 10,
            score: 0,
            status: AssessmentStatus::Pending,
        })
        .await
        .unwrap();
    service
        .create(NewAssessment {
            candidate_id: 2,
            job_id: 11,
            score: 88,
            status: AssessmentStatus::Completed,
        })
        .await
        .unwrap();

    let filter = AssessmentListFilter {
        status: Some("pending".to_string()),
        ..AssessmentListFilter::default()
    };
    let page = service.list(&filter, 1, 20).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, pending.id);

    let filter = AssessmentListFilter {
        job_id: Some(11),
        candidate_id: Some(2),
        ..AssessmentListFilter::default()
    };
    let page = service.list(&filter, 1, 20).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].score, 88);
}

#[tokio::test]
async fn score_is_bounded_on_create_and_update() {
    let service = service();
    match service
        .create(NewAssessment {
            candidate_id: 1,
            job_id: 1,
            score: 101,
            status: AssessmentStatus::Pending,
        })
        .await
    {
        Err(AssessmentServiceError::Validation(_)) => {}
        other => panic!("expected validation error, got {other:?}"),
    }

    let assessment = service
        .create(NewAssessment {
            candidate_id: 1,
            job_id: 1,
            score: 100,
            status: AssessmentStatus::Pending,
        })
        .await
        .unwrap();
    match service
        .update(
            assessment.id,
            AssessmentPatch {
                score: Some(250),
                status: None,
            },
        )
        .await
    {
        Err(AssessmentServiceError::Validation(_)) => {}
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn update_of_a_missing_assessment_is_not_found() {
    let service = service();
    match service.update(404, AssessmentPatch::default()).await {
        Err(AssessmentServiceError::NotFound) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_builder_reads_as_empty() {
    let service = service();
    let builder = service.builder(7).await.unwrap();
    assert_eq!(builder.job_id, 7);
    assert!(builder.sections.is_empty());
}

#[tokio::test]
async fn put_builder_replaces_the_document_wholesale() {
    let service = service();
    service.put_builder(7, form()).await.unwrap();
    let builder = service.builder(7).await.unwrap();
    assert_eq!(builder.sections.len(), 1);
    assert_eq!(builder.sections[0].questions.len(), 3);

    service.put_builder(7, Vec::new()).await.unwrap();
    assert!(service.builder(7).await.unwrap().sections.is_empty());
}

#[tokio::test]
async fn builder_validation_rejects_malformed_forms() {
    let service = service();

    // A choice question without options.
    let sections = vec![Section {
        title: "s".to_string(),
        questions: vec![question("q1", QuestionKind::Single)],
    }];
    assert!(matches!(
        service.put_builder(1, sections).await,
        Err(AssessmentServiceError::Validation(_))
    ));

    // Duplicate question ids.
    let sections = vec![Section {
        title: "s".to_string(),
        questions: vec![
            question("q1", QuestionKind::Short),
            question("q1", QuestionKind::Short),
        ],
    }];
    assert!(matches!(
        service.put_builder(1, sections).await,
        Err(AssessmentServiceError::Validation(_))
    ));

    // Inverted numeric bounds.
    let mut bad_bounds = question("q1", QuestionKind::Number);
    bad_bounds.min = Some(10.0);
    bad_bounds.max = Some(1.0);
    let sections = vec![Section {
        title: "s".to_string(),
        questions: vec![bad_bounds],
    }];
    assert!(matches!(
        service.put_builder(1, sections).await,
        Err(AssessmentServiceError::Validation(_))
    ));

    // Visibility rule pointing at a question that does not exist.
    let mut dangling = question("q1", QuestionKind::Short);
    dangling.show_if = Some(ShowIf {
        question_id: "ghost".to_string(),
        equals: "yes".to_string(),
    });
    let sections = vec![Section {
        title: "s".to_string(),
        questions: vec![dangling],
    }];
    assert!(matches!(
        service.put_builder(1, sections).await,
        Err(AssessmentServiceError::Validation(_))
    ));
}

#[tokio::test]
async fn submit_accepts_a_complete_valid_response() {
    let service = service();
    service.put_builder(7, form()).await.unwrap();

    let response = service
        .submit(
            7,
            3,
            answers(&[
                (
                    "stack",
                    Answer::Single {
                        value: "rust".to_string(),
                    },
                ),
                ("years", Answer::Number { value: 5.0 }),
                (
                    "details",
                    Answer::Long {
                        value: "Mostly services".to_string(),
                    },
                ),
            ]),
        )
        .await
        .unwrap();
    assert!(response.id > 0);
    assert_eq!(response.candidate_id, 3);

    let stored = service.responses(7).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0], response);
}

#[tokio::test]
async fn submit_enforces_required_kind_options_and_bounds() {
    let service = service();
    service.put_builder(7, form()).await.unwrap();

    // Required question missing.
    assert!(matches!(
        service.submit(7, 3, answers(&[])).await,
        Err(AssessmentServiceError::Validation(_))
    ));

    // Wrong answer shape for the question type.
    assert!(matches!(
        service
            .submit(
                7,
                3,
                answers(&[("stack", Answer::Number { value: 1.0 })]),
            )
            .await,
        Err(AssessmentServiceError::Validation(_))
    ));

    // Option outside the declared set.
    assert!(matches!(
        service
            .submit(
                7,
                3,
                answers(&[(
                    "stack",
                    Answer::Single {
                        value: "cobol".to_string()
                    }
                )]),
            )
            .await,
        Err(AssessmentServiceError::Validation(_))
    ));

    // Number out of bounds.
    assert!(matches!(
        service
            .submit(
                7,
                3,
                answers(&[
                    (
                        "stack",
                        Answer::Single {
                            value: "go".to_string()
                        }
                    ),
                    ("years", Answer::Number { value: 99.0 }),
                ]),
            )
            .await,
        Err(AssessmentServiceError::Validation(_))
    ));

    // Answer keyed by an unknown question id.
    assert!(matches!(
        service
            .submit(
                7,
                3,
                answers(&[(
                    "ghost",
                    Answer::Short {
                        value: "boo".to_string()
                    }
                )]),
            )
            .await,
        Err(AssessmentServiceError::Validation(_))
    ));
}

#[tokio::test]
async fn hidden_required_questions_are_not_enforced() {
    let service = service();
    service.put_builder(7, form()).await.unwrap();

    // "details" is required only when stack == rust.
    let response = service
        .submit(
            7,
            3,
            answers(&[(
                "stack",
                Answer::Single {
                    value: "go".to_string(),
                },
            )]),
        )
        .await
        .unwrap();
    assert_eq!(response.answers.len(), 1);
}

#[tokio::test]
async fn delete_is_idempotent_by_effect() {
    let service = service();
    let assessment = service
        .create(NewAssessment {
            candidate_id: 1,
            job_id: 1,
            score: 10,
            status: AssessmentStatus::Pending,
        })
        .await
        .unwrap();
    service.delete(assessment.id).await.unwrap();
    service.delete(assessment.id).await.unwrap();
    let page = service
        .list(&AssessmentListFilter::default(), 1, 20)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}
