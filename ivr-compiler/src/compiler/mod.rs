//! Audio compiler
//!
//! Turns an identity-assigned tree into audio files, one synthesis attempt
//! per node:
//! - jobs are dispatched in pre-order, at most `max_concurrent` in flight
//! - every resolved attempt bumps the build's progress through the registry
//! - a failed node is recorded on the node and never blocks its siblings
//! - cancellation stops dispatch; in-flight attempts finish
//!
//! Results land in per-node slots and are applied to the tree once the
//! dispatch loop drains, so the tree itself is only touched by its owner.

pub mod job;

pub use job::{work_list, NodeFailure, NodeOutcome, SynthesisJob};

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use ivr_common::config::{CompilerConfig, TtsConfig};
use ivr_common::events::{EventBus, IvrEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::IvrNode;
use crate::registry::{BuildRegistry, RegistryError};
use crate::services::SpeechSynthesizer;
use crate::storage::TreeStore;

/// Per-build synthesis parameters
#[derive(Debug, Clone)]
pub struct CompilerSettings {
    pub voice_id: String,
    /// Provider output format, e.g. `mp3_44100_128`
    pub output_format: String,
    /// Artifact file extension matching `output_format`
    pub audio_extension: String,
    pub max_concurrent: usize,
}

impl CompilerSettings {
    pub fn from_config(voice_id: impl Into<String>, tts: &TtsConfig, compiler: &CompilerConfig) -> Self {
        Self {
            voice_id: voice_id.into(),
            output_format: tts.output_format.clone(),
            audio_extension: tts.audio_extension().to_string(),
            max_concurrent: compiler.max_concurrent_syntheses,
        }
    }
}

/// Summary of one finished compilation
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub build_id: Uuid,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub tree: Arc<IvrNode>,
}

#[derive(Clone)]
pub struct AudioCompiler {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    registry: BuildRegistry,
    event_bus: EventBus,
    audio_root: PathBuf,
    tree_store: Option<TreeStore>,
    settings: CompilerSettings,
}

impl AudioCompiler {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        registry: BuildRegistry,
        event_bus: EventBus,
        audio_root: impl Into<PathBuf>,
        settings: CompilerSettings,
    ) -> Self {
        Self {
            synthesizer,
            registry,
            event_bus,
            audio_root: audio_root.into(),
            tree_store: None,
            settings,
        }
    }

    /// Persist every finalized tree before the build is marked done
    pub fn with_tree_store(mut self, store: TreeStore) -> Self {
        self.tree_store = Some(store);
        self
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Compile `root`, which must already carry ids and artifact paths
    ///
    /// The build must be registered with `total == root.node_count()`.
    /// Returns once every dispatched attempt resolved and `done` is set.
    pub async fn compile(
        &self,
        build_id: Uuid,
        mut root: IvrNode,
        cancel: CancellationToken,
    ) -> Result<CompileReport, RegistryError> {
        let jobs = work_list(&root);
        let total = jobs.len();
        let max_concurrent = self.settings.max_concurrent.max(1);

        tracing::info!(%build_id, total, max_concurrent, "Starting audio compilation");

        let build_dir = self.audio_root.join(build_id.to_string());
        if let Err(e) = tokio::fs::create_dir_all(&build_dir).await {
            // Every write below will fail and be recorded per node
            tracing::error!(%build_id, error = %e, dir = %build_dir.display(), "Failed to create build audio directory");
        }

        let mut slots: Vec<Option<NodeOutcome>> = (0..total).map(|_| None).collect();
        let mut pending = jobs.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut failed = 0;
        let mut completed = 0;

        if !cancel.is_cancelled() {
            for job in pending.by_ref().take(max_concurrent) {
                in_flight.push(self.attempt(job));
            }
            self.registry.mark_running(build_id).await?;
        }

        let mut cancel_seen = false;
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled(), if !cancel_seen => {
                    cancel_seen = true;
                    tracing::info!(
                        %build_id,
                        in_flight = in_flight.len(),
                        queued = pending.len(),
                        "Cancellation received, draining in-flight attempts"
                    );
                }

                next = in_flight.next() => {
                    let Some((index, node_id, outcome)) = next else {
                        break;
                    };

                    let succeeded = outcome.is_ok();
                    if let Err(failure) = &outcome {
                        failed += 1;
                        tracing::warn!(%build_id, node_id = %node_id, error = %failure, "Node synthesis failed");
                        self.event_bus.emit_lossy(IvrEvent::NodeSynthesisFailed {
                            build_id,
                            node_id: node_id.clone(),
                            error: failure.to_string(),
                            timestamp: Utc::now(),
                        });
                    }
                    slots[index] = Some(outcome);

                    match self.registry.record_attempt(build_id, succeeded).await {
                        Ok(count) => {
                            completed = count;
                            tracing::debug!(%build_id, node_id = %node_id, completed, total, "Node attempt resolved");
                            self.event_bus.emit_lossy(IvrEvent::BuildProgress {
                                build_id,
                                completed,
                                total,
                                timestamp: Utc::now(),
                            });
                        }
                        Err(e) => {
                            tracing::error!(%build_id, node_id = %node_id, error = %e, "Failed to record node attempt");
                        }
                    }

                    if !cancel.is_cancelled() {
                        if let Some(job) = pending.next() {
                            in_flight.push(self.attempt(job));
                        }
                    }
                }
            }
        }

        let cancelled = !pending.as_slice().is_empty();

        root.visit_preorder_mut(&mut |index, node| match slots[index].take() {
            Some(Ok(path)) => node.mark_synthesized(path),
            Some(Err(failure)) => node.mark_failed(failure.to_string()),
            None => {}
        });

        let tree = self.registry.finalize(build_id, root).await?;

        if let Some(store) = &self.tree_store {
            if let Err(e) = store.save(build_id, &tree).await {
                tracing::error!(%build_id, error = %e, "Failed to persist finalized tree");
            }
        }

        self.registry.complete(build_id, cancelled).await?;

        if cancelled {
            tracing::info!(%build_id, completed, total, "Build cancelled");
            self.event_bus.emit_lossy(IvrEvent::BuildCancelled {
                build_id,
                completed,
                total,
                timestamp: Utc::now(),
            });
        } else {
            tracing::info!(%build_id, completed, total, failed, "Build completed");
            self.event_bus.emit_lossy(IvrEvent::BuildCompleted {
                build_id,
                completed,
                total,
                failed,
                timestamp: Utc::now(),
            });
        }

        Ok(CompileReport {
            build_id,
            total,
            completed,
            failed,
            cancelled,
            tree,
        })
    }

    /// Run one node's attempt: synthesize, then write the artifact
    async fn attempt(&self, job: SynthesisJob) -> (usize, String, NodeOutcome) {
        let outcome = self.synthesize_node(&job).await;
        (job.index, job.node_id, outcome)
    }

    async fn synthesize_node(&self, job: &SynthesisJob) -> NodeOutcome {
        if job.text.is_empty() {
            return Err(NodeFailure::EmptyText);
        }

        let audio = self
            .synthesizer
            .synthesize(&job.text, &self.settings.voice_id, &self.settings.output_format)
            .await?;

        let path = self.audio_root.join(&job.artifact);
        tokio::fs::write(&path, &audio)
            .await
            .map_err(|source| NodeFailure::Write { path, source })?;

        Ok(job.artifact.clone())
    }
}
