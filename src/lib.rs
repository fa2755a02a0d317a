//! A typed client for the MLflow tracking REST API.
//!
//! [`Server`] implements [`Client`] over HTTP. Every operation goes through
//! one dispatcher, see [`backend::dispatch`].

pub mod api;
pub mod backend;
pub mod tracking;

pub use api::client::{Client, ViewType};
pub use api::error::{Error, Result};
pub use api::id::{ExperimentId, PageToken, RunId};
pub use api::search::{RunPage, SearchRuns};
pub use backend::rest::Server;

/// Utility function to create a MLflow timestamp.
pub fn timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis().try_into().unwrap_or(i64::MAX))
        .unwrap_or(0)
}
