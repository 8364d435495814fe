//! Build runner: upload → registered build → background compilation
//!
//! Parsing, normalization and identity assignment run synchronously in
//! `submit`, so a malformed upload is rejected before any build id exists.
//! Compilation then runs on its own task.

use chrono::Utc;
use ivr_common::events::{EventBus, IvrEvent};
use sqlx::SqlitePool;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::compiler::AudioCompiler;
use crate::db::builds;
use crate::identity;
use crate::ingest::{self, ParseError, SourceFormat};
use crate::models::BuildMeta;
use crate::registry::{BuildRegistry, RegistryError};

/// Name recorded for uploads without a file name
const DEFAULT_SOURCE_NAME: &str = "upload";

/// One uploaded menu description
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    /// Explicit format, overrides the file name extension
    pub format_hint: Option<String>,
}

impl Upload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            ..Self::default()
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format_hint = Some(format.into());
        self
    }

    fn declared_extension(&self) -> Option<&str> {
        self.format_hint
            .as_deref()
            .filter(|hint| !hint.trim().is_empty())
            .or_else(|| self.file_name.as_deref().and_then(SourceFormat::extension_of))
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Accepted build
#[derive(Debug)]
pub struct BuildHandle {
    pub build_id: Uuid,
    pub total: usize,
    /// Compilation task; resolves after the build is done and recorded
    pub task: JoinHandle<()>,
}

#[derive(Clone)]
pub struct BuildRunner {
    compiler: AudioCompiler,
    registry: BuildRegistry,
    event_bus: EventBus,
    db: Option<SqlitePool>,
    tasks: TaskTracker,
}

impl BuildRunner {
    pub fn new(compiler: AudioCompiler, registry: BuildRegistry, event_bus: EventBus) -> Self {
        Self {
            compiler,
            registry,
            event_bus,
            db: None,
            tasks: TaskTracker::new(),
        }
    }

    /// Record build history in the database
    pub fn with_database(mut self, db: SqlitePool) -> Self {
        self.db = Some(db);
        self
    }

    pub fn registry(&self) -> &BuildRegistry {
        &self.registry
    }

    /// Accept an upload and start compiling it in the background
    pub async fn submit(&self, upload: Upload) -> Result<BuildHandle, SubmitError> {
        let (mut tree, format) = ingest::ingest(&upload.bytes, upload.declared_extension())?;

        let build_id = Uuid::new_v4();
        let settings = self.compiler.settings();
        let total = identity::assign(&mut tree, build_id, &settings.audio_extension);

        let source_name = upload
            .file_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SOURCE_NAME.to_string());
        let meta = BuildMeta {
            source_name: source_name.clone(),
            format: format.as_str().to_string(),
            voice_id: settings.voice_id.clone(),
            created_at: Utc::now(),
        };

        self.registry.create(build_id, total, meta).await?;
        let cancel = self.registry.cancellation_token(build_id).await?;
        self.record_status(build_id).await;

        tracing::info!(%build_id, source = %source_name, format = %format, total, "Build accepted");
        self.event_bus.emit_lossy(IvrEvent::BuildStarted {
            build_id,
            source_name,
            total_nodes: total,
            timestamp: Utc::now(),
        });

        let runner = self.clone();
        let task = self.tasks.spawn(async move {
            match runner.compiler.compile(build_id, tree, cancel).await {
                Ok(report) => {
                    tracing::debug!(
                        %build_id,
                        completed = report.completed,
                        failed = report.failed,
                        cancelled = report.cancelled,
                        "Compilation task finished"
                    );
                }
                Err(e) => {
                    tracing::error!(%build_id, error = %e, "Compilation aborted");
                }
            }
            runner.record_status(build_id).await;
        });

        Ok(BuildHandle {
            build_id,
            total,
            task,
        })
    }

    /// Stop every unfinished build and wait up to `grace` for its task
    ///
    /// In-flight attempts finish and each history row is recorded before the
    /// task exits. Returns false when the grace period ran out first.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        for status in self.registry.list().await {
            if !status.progress.done {
                if let Err(e) = self.registry.cancel(status.build_id).await {
                    tracing::debug!(build_id = %status.build_id, error = %e, "Build finished before shutdown cancel");
                }
            }
        }

        self.tasks.close();
        tracing::info!(running = self.tasks.len(), "Waiting for compilation tasks");
        tokio::time::timeout(grace, self.tasks.wait()).await.is_ok()
    }

    /// Mirror the registry status into the build history table
    async fn record_status(&self, build_id: Uuid) {
        let Some(db) = &self.db else {
            return;
        };

        let status = match self.registry.status(build_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(%build_id, error = %e, "No status to record");
                return;
            }
        };

        if let Err(e) = builds::save_build(db, &status).await {
            tracing::warn!(%build_id, error = %e, "Failed to record build history");
        }
    }
}
