//! Job postings: listing with search/status/tag filters, slug-checked
//! creation and renaming, manual ranking, and archival.

pub mod domain;
pub mod router;
pub mod service;


pub use domain::{slugify, Job, JobPatch, JobStatus, NewJob};
pub use router::jobs_router;
pub use service::{JobListFilter, JobService, JobServiceError, DEFAULT_PAGE_SIZE};
