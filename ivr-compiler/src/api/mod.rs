//! HTTP API handlers for ivr-compiler
//!
//! REST for submission, retrieval and control; SSE for live progress.

pub mod builds;
pub mod health;
pub mod progress;
pub mod sse;
pub mod tree;
pub mod upload;

pub use builds::build_routes;
pub use health::health_routes;
pub use progress::progress_stream;
pub use sse::event_stream;
pub use tree::tree_routes;
pub use upload::upload_routes;

use uuid::Uuid;

use crate::error::ApiError;

/// Build ids that do not parse can never exist, so they are reported as 404
pub(crate) fn parse_build_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("Build not found: {}", raw)))
}
