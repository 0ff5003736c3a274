//! Hiring-pipeline service core: document store, resource services, HTTP
//! routers, and the client-side query cache with its optimistic update
//! protocol.

pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod telemetry;
