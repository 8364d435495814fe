//! # IVR Common Library
//!
//! Shared code for the IVR compiler service and its tools:
//! - Error and result types
//! - Configuration loading and root folder resolution
//! - Build event types and the EventBus used for SSE broadcasting

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
