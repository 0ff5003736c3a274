//! In-process client over the pipeline router: a JSON transport with the
//! interception-layer retry heuristic, a snapshot cache of list views, and
//! an optimistic jobs client that patches cached views before a command is
//! issued and rolls them back when it fails.

pub mod cache;
pub mod jobs;
pub mod transport;

pub use cache::{MutationGuard, QueryCache, QueryKey};
pub use jobs::{JobListParams, JobsClient};
pub use transport::{ApiClient, TransportError};
