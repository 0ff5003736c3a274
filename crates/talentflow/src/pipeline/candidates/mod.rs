//! Candidates: stage progression through the pipeline with an append-only
//! timeline of stage moves and recruiter notes.

pub mod domain;
pub mod router;
pub mod service;


pub use domain::{Candidate, CandidatePatch, NewCandidate, Stage, TimelineEntry, TimelineKind};
pub use router::candidates_router;
pub use service::{CandidateListFilter, CandidateService, CandidateServiceError};
