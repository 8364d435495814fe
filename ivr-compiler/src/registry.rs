//! In-memory build registry
//!
//! Tracks progress, cancellation and the finalized tree of every build the
//! process has accepted. The map itself sits behind a `tokio::sync::RwLock`;
//! per-build counters are atomics so the compiler's hot path only takes the
//! read lock.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{BuildMeta, BuildState, BuildStatus, IvrNode, ProgressRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown build: {0}")]
    UnknownBuild(Uuid),

    #[error("Build already exists: {0}")]
    DuplicateBuild(Uuid),

    #[error("Build {0} already has a different finalized tree")]
    AlreadyFinalized(Uuid),

    #[error("Progress {completed}/{total} out of range for build {build_id}")]
    ProgressOutOfRange {
        build_id: Uuid,
        completed: usize,
        total: usize,
    },

    #[error("Build {0} is already done")]
    BuildClosed(Uuid),

    #[error("Build {build_id} cannot finish at {completed}/{total} unless cancelled")]
    Incomplete {
        build_id: Uuid,
        completed: usize,
        total: usize,
    },

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Mutable state of one build
#[derive(Debug)]
struct BuildEntry {
    total: usize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    started: AtomicBool,
    done: AtomicBool,
    cancelled: AtomicBool,
    cancel_token: CancellationToken,
    tree: OnceLock<Arc<IvrNode>>,
    meta: BuildMeta,
    finished_at: OnceLock<DateTime<Utc>>,
}

impl BuildEntry {
    fn new(total: usize, meta: BuildMeta) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            started: AtomicBool::new(false),
            done: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            cancel_token: CancellationToken::new(),
            tree: OnceLock::new(),
            meta,
            finished_at: OnceLock::new(),
        }
    }

    fn progress(&self) -> ProgressRecord {
        // done is read first: once observed true, completed is final
        let done = self.done.load(Ordering::Acquire);
        ProgressRecord {
            completed: self.completed.load(Ordering::Acquire),
            total: self.total,
            done,
        }
    }

    fn state(&self) -> BuildState {
        if self.done.load(Ordering::Acquire) {
            BuildState::Done
        } else if self.started.load(Ordering::Acquire) {
            BuildState::Running
        } else {
            BuildState::Pending
        }
    }
}

/// Registry of all builds accepted by this process
#[derive(Debug, Clone, Default)]
pub struct BuildRegistry {
    builds: Arc<RwLock<HashMap<Uuid, Arc<BuildEntry>>>>,
}

impl BuildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, build_id: Uuid) -> Result<Arc<BuildEntry>, RegistryError> {
        self.builds
            .read()
            .await
            .get(&build_id)
            .cloned()
            .ok_or(RegistryError::UnknownBuild(build_id))
    }

    /// Register a new build with `total` nodes
    pub async fn create(&self, build_id: Uuid, total: usize, meta: BuildMeta) -> Result<(), RegistryError> {
        let mut builds = self.builds.write().await;
        if builds.contains_key(&build_id) {
            return Err(RegistryError::DuplicateBuild(build_id));
        }
        builds.insert(build_id, Arc::new(BuildEntry::new(total, meta)));
        tracing::debug!(%build_id, total, "Build registered");
        Ok(())
    }

    /// Publish an absolute progress value
    ///
    /// Monotonic: a lower `completed` than the current one is ignored, and
    /// nothing changes once the build is done. `done` is only accepted once
    /// every node has been attempted; cancelled builds close via [`Self::complete`].
    pub async fn update_progress(&self, build_id: Uuid, completed: usize, done: bool) -> Result<(), RegistryError> {
        let entry = self.entry(build_id).await?;
        if completed > entry.total {
            return Err(RegistryError::ProgressOutOfRange {
                build_id,
                completed,
                total: entry.total,
            });
        }
        if entry.done.load(Ordering::Acquire) {
            return Ok(());
        }
        if done {
            Self::check_finished(build_id, &entry, completed)?;
        }

        entry.completed.fetch_max(completed, Ordering::AcqRel);
        if done {
            Self::close(&entry, false);
        }
        Ok(())
    }

    /// Count one resolved attempt and return the new `completed` value
    pub async fn record_attempt(&self, build_id: Uuid, succeeded: bool) -> Result<usize, RegistryError> {
        let entry = self.entry(build_id).await?;
        if entry.done.load(Ordering::Acquire) {
            return Err(RegistryError::BuildClosed(build_id));
        }

        let total = entry.total;
        let previous = entry
            .completed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < total).then_some(current + 1)
            })
            .map_err(|current| RegistryError::ProgressOutOfRange {
                build_id,
                completed: current + 1,
                total,
            })?;

        if !succeeded {
            entry.failed.fetch_add(1, Ordering::AcqRel);
        }
        Ok(previous + 1)
    }

    /// Mark the build as running (first dispatch happened)
    pub async fn mark_running(&self, build_id: Uuid) -> Result<(), RegistryError> {
        let entry = self.entry(build_id).await?;
        entry.started.store(true, Ordering::Release);
        Ok(())
    }

    /// Set `done`; returns false when the build was already done
    ///
    /// Without `cancelled`, every node must have been attempted.
    pub async fn complete(&self, build_id: Uuid, cancelled: bool) -> Result<bool, RegistryError> {
        let entry = self.entry(build_id).await?;
        if !cancelled && !entry.done.load(Ordering::Acquire) {
            Self::check_finished(build_id, &entry, 0)?;
        }
        Ok(Self::close(&entry, cancelled))
    }

    fn check_finished(build_id: Uuid, entry: &BuildEntry, completed: usize) -> Result<(), RegistryError> {
        let completed = entry.completed.load(Ordering::Acquire).max(completed);
        if completed == entry.total {
            Ok(())
        } else {
            Err(RegistryError::Incomplete {
                build_id,
                completed,
                total: entry.total,
            })
        }
    }

    fn close(entry: &BuildEntry, cancelled: bool) -> bool {
        if cancelled {
            entry.cancelled.store(true, Ordering::Release);
        }
        let first = entry
            .done
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            let _ = entry.finished_at.set(Utc::now());
        }
        first
    }

    /// Store the finished tree
    ///
    /// Repeating with an identical tree is a no-op; a different tree is rejected.
    pub async fn finalize(&self, build_id: Uuid, root: IvrNode) -> Result<Arc<IvrNode>, RegistryError> {
        let entry = self.entry(build_id).await?;
        let stored = entry.tree.get_or_init(|| Arc::new(root.clone()));
        if **stored == root {
            Ok(Arc::clone(stored))
        } else {
            Err(RegistryError::AlreadyFinalized(build_id))
        }
    }

    pub async fn get_tree(&self, build_id: Uuid) -> Result<Arc<IvrNode>, RegistryError> {
        let entry = self
            .builds
            .read()
            .await
            .get(&build_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("build {}", build_id)))?;
        entry
            .tree
            .get()
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("tree for build {}", build_id)))
    }

    pub async fn get_progress(&self, build_id: Uuid) -> Result<ProgressRecord, RegistryError> {
        self.builds
            .read()
            .await
            .get(&build_id)
            .map(|entry| entry.progress())
            .ok_or_else(|| RegistryError::NotFound(format!("build {}", build_id)))
    }

    pub async fn status(&self, build_id: Uuid) -> Result<BuildStatus, RegistryError> {
        let entry = self.entry(build_id).await?;
        Ok(Self::status_of(build_id, &entry))
    }

    fn status_of(build_id: Uuid, entry: &BuildEntry) -> BuildStatus {
        BuildStatus {
            build_id,
            state: entry.state(),
            progress: entry.progress(),
            failed: entry.failed.load(Ordering::Acquire),
            cancelled: entry.cancelled.load(Ordering::Acquire),
            meta: entry.meta.clone(),
            finished_at: entry.finished_at.get().copied(),
        }
    }

    /// Status of every build held in memory, newest first
    pub async fn list(&self) -> Vec<BuildStatus> {
        let builds = self.builds.read().await;
        let mut statuses: Vec<BuildStatus> = builds
            .iter()
            .map(|(build_id, entry)| Self::status_of(*build_id, entry))
            .collect();
        statuses.sort_by(|a, b| b.meta.created_at.cmp(&a.meta.created_at));
        statuses
    }

    /// Token the compiler watches for this build
    pub async fn cancellation_token(&self, build_id: Uuid) -> Result<CancellationToken, RegistryError> {
        Ok(self.entry(build_id).await?.cancel_token.clone())
    }

    /// Request cancellation; queued jobs are not dispatched afterwards
    pub async fn cancel(&self, build_id: Uuid) -> Result<(), RegistryError> {
        let entry = self.entry(build_id).await?;
        if entry.done.load(Ordering::Acquire) {
            return Err(RegistryError::BuildClosed(build_id));
        }
        entry.cancel_token.cancel();
        tracing::info!(%build_id, "Build cancellation requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> BuildMeta {
        BuildMeta {
            source_name: "menu.json".to_string(),
            format: "json".to_string(),
            voice_id: "voice".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let registry = BuildRegistry::new();
        let id = Uuid::new_v4();
        registry.create(id, 3, meta()).await.unwrap();
        assert_eq!(registry.create(id, 3, meta()).await, Err(RegistryError::DuplicateBuild(id)));
    }

    #[tokio::test]
    async fn test_unknown_build() {
        let registry = BuildRegistry::new();
        let id = Uuid::new_v4();
        assert_eq!(
            registry.update_progress(id, 1, false).await,
            Err(RegistryError::UnknownBuild(id))
        );
        assert!(matches!(registry.get_progress(id).await, Err(RegistryError::NotFound(_))));
        assert!(matches!(registry.get_tree(id).await, Err(RegistryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_bounded() {
        let registry = BuildRegistry::new();
        let id = Uuid::new_v4();
        registry.create(id, 3, meta()).await.unwrap();

        registry.update_progress(id, 2, false).await.unwrap();
        registry.update_progress(id, 1, false).await.unwrap();
        assert_eq!(registry.get_progress(id).await.unwrap().completed, 2);

        assert!(matches!(
            registry.update_progress(id, 4, false).await,
            Err(RegistryError::ProgressOutOfRange { completed: 4, total: 3, .. })
        ));

        registry.update_progress(id, 3, true).await.unwrap();
        registry.update_progress(id, 3, false).await.unwrap();
        let progress = registry.get_progress(id).await.unwrap();
        assert!(progress.done, "done never reverts");
        assert_eq!(progress.completed, 3);
    }

    #[tokio::test]
    async fn test_done_requires_every_node_unless_cancelled() {
        let registry = BuildRegistry::new();
        let id = Uuid::new_v4();
        registry.create(id, 3, meta()).await.unwrap();

        assert_eq!(
            registry.update_progress(id, 1, true).await,
            Err(RegistryError::Incomplete { build_id: id, completed: 1, total: 3 })
        );
        assert_eq!(
            registry.complete(id, false).await,
            Err(RegistryError::Incomplete { build_id: id, completed: 0, total: 3 })
        );
        let progress = registry.get_progress(id).await.unwrap();
        assert!(!progress.done);
        assert_eq!(progress.completed, 0);

        // A cancelled build may stop short
        registry.record_attempt(id, true).await.unwrap();
        assert_eq!(registry.complete(id, true).await, Ok(true));
        let status = registry.status(id).await.unwrap();
        assert!(status.progress.done);
        assert!(status.cancelled);
        assert_eq!(status.progress.completed, 1);
    }

    #[tokio::test]
    async fn test_record_attempt_stops_at_total() {
        let registry = BuildRegistry::new();
        let id = Uuid::new_v4();
        registry.create(id, 2, meta()).await.unwrap();

        assert_eq!(registry.record_attempt(id, true).await, Ok(1));
        assert_eq!(registry.record_attempt(id, false).await, Ok(2));
        assert!(matches!(
            registry.record_attempt(id, true).await,
            Err(RegistryError::ProgressOutOfRange { .. })
        ));

        let status = registry.status(id).await.unwrap();
        assert_eq!(status.failed, 1);
        assert_eq!(status.progress.completed, 2);
    }

    #[tokio::test]
    async fn test_concurrent_attempts_are_counted_once_each() {
        let registry = BuildRegistry::new();
        let id = Uuid::new_v4();
        registry.create(id, 50, meta()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move { registry.record_attempt(id, true).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(registry.get_progress(id).await.unwrap().completed, 50);
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent_for_identical_tree() {
        let registry = BuildRegistry::new();
        let id = Uuid::new_v4();
        registry.create(id, 1, meta()).await.unwrap();

        let tree = IvrNode::leaf("Hello");
        registry.finalize(id, tree.clone()).await.unwrap();
        registry.finalize(id, tree.clone()).await.unwrap();
        assert_eq!(*registry.get_tree(id).await.unwrap(), tree);

        assert_eq!(
            registry.finalize(id, IvrNode::leaf("Other")).await,
            Err(RegistryError::AlreadyFinalized(id))
        );
    }

    #[tokio::test]
    async fn test_complete_happens_once() {
        let registry = BuildRegistry::new();
        let id = Uuid::new_v4();
        registry.create(id, 0, meta()).await.unwrap();

        assert_eq!(registry.complete(id, false).await, Ok(true));
        assert_eq!(registry.complete(id, false).await, Ok(false));
        let status = registry.status(id).await.unwrap();
        assert_eq!(status.state, BuildState::Done);
        assert!(status.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_cancel() {
        let registry = BuildRegistry::new();
        let id = Uuid::new_v4();
        registry.create(id, 2, meta()).await.unwrap();

        let token = registry.cancellation_token(id).await.unwrap();
        registry.cancel(id).await.unwrap();
        assert!(token.is_cancelled());

        registry.complete(id, true).await.unwrap();
        assert_eq!(registry.cancel(id).await, Err(RegistryError::BuildClosed(id)));
        assert!(registry.status(id).await.unwrap().cancelled);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let registry = BuildRegistry::new();
        let id = Uuid::new_v4();
        registry.create(id, 1, meta()).await.unwrap();
        assert_eq!(registry.status(id).await.unwrap().state, BuildState::Pending);

        registry.mark_running(id).await.unwrap();
        assert_eq!(registry.status(id).await.unwrap().state, BuildState::Running);
        assert_eq!(registry.list().await.len(), 1);
    }
}
