//! Build lifecycle and progress types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Build workflow state
///
/// `Pending` → `Running` → `Done`. There is no failed state: a build is done
/// once every node was attempted (or dispatch stopped on cancellation),
/// whatever the individual outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildState {
    /// Nodes enumerated, no attempt dispatched yet
    Pending,
    /// Synthesis in progress
    Running,
    /// All attempts resolved
    Done,
}

impl BuildState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildState::Pending => "PENDING",
            BuildState::Running => "RUNNING",
            BuildState::Done => "DONE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(BuildState::Pending),
            "RUNNING" => Some(BuildState::Running),
            "DONE" => Some(BuildState::Done),
            _ => None,
        }
    }
}

/// Progress snapshot streamed to subscribers
///
/// `completed` counts attempts, not successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub completed: usize,
    pub total: usize,
    pub done: bool,
}

/// Descriptive data captured when a build is accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildMeta {
    /// Uploaded file name, or "upload"
    pub source_name: String,
    /// Format the input was parsed as
    pub format: String,
    pub voice_id: String,
    pub created_at: DateTime<Utc>,
}

/// Full status of one build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildStatus {
    pub build_id: Uuid,
    pub state: BuildState,
    pub progress: ProgressRecord,
    /// Attempts that left the node without audio
    pub failed: usize,
    /// Dispatch stopped before every node was attempted
    pub cancelled: bool,
    #[serde(flatten)]
    pub meta: BuildMeta,
    pub finished_at: Option<DateTime<Utc>>,
}
