//! Assessments: scored rows per candidate, a per-job builder document
//! describing the form, and append-only submitted responses.

pub mod domain;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    validate_answers, validate_builder, Answer, Assessment, AssessmentBuilder, AssessmentPatch,
    AssessmentResponse, AssessmentStatus, NewAssessment, Question, QuestionKind, Section, ShowIf,
};
pub use router::assessments_router;
pub use service::{AssessmentListFilter, AssessmentService, AssessmentServiceError};
