//! Data models for the IVR compiler

pub mod build;
pub mod ivr_node;

pub use build::{BuildMeta, BuildState, BuildStatus, ProgressRecord};
pub use ivr_node::IvrNode;
