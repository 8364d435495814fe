//! Test Helper Utilities
//!
//! Shared fixtures for ivr-compiler integration tests

#![allow(dead_code)]

pub mod stub_synthesizer;

pub use stub_synthesizer::{Gate, StubSynthesizer};

use chrono::Utc;
use ivr_common::events::EventBus;
use ivr_compiler::compiler::{AudioCompiler, CompilerSettings};
use ivr_compiler::identity;
use ivr_compiler::models::{BuildMeta, IvrNode};
use ivr_compiler::registry::BuildRegistry;
use ivr_compiler::services::BuildRunner;
use ivr_compiler::storage::TreeStore;
use ivr_compiler::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// `root -> [childA, childB]`
pub const TWO_LEVEL_MENU: &str = r#"{"text": "root", "children": [{"text": "childA"}, {"text": "childB"}]}"#;

pub fn two_level_tree() -> IvrNode {
    IvrNode::new("root", vec![IvrNode::leaf("childA"), IvrNode::leaf("childB")])
}

/// Compiler wired to a stub synthesizer over a temporary root folder
pub struct Harness {
    pub temp: TempDir,
    pub synthesizer: Arc<StubSynthesizer>,
    pub registry: BuildRegistry,
    pub event_bus: EventBus,
    pub store: TreeStore,
    pub compiler: AudioCompiler,
}

impl Harness {
    pub fn new(synthesizer: StubSynthesizer, max_concurrent: usize) -> Self {
        let temp = TempDir::new().unwrap();
        let synthesizer = Arc::new(synthesizer);
        let registry = BuildRegistry::new();
        let event_bus = EventBus::new(256);
        let store = TreeStore::new(temp.path().join("builds"));

        let settings = CompilerSettings {
            voice_id: "test-voice".to_string(),
            output_format: "mp3_44100_128".to_string(),
            audio_extension: "mp3".to_string(),
            max_concurrent,
        };
        let compiler = AudioCompiler::new(
            synthesizer.clone(),
            registry.clone(),
            event_bus.clone(),
            temp.path().join("audio"),
            settings,
        )
        .with_tree_store(store.clone());

        Self {
            temp,
            synthesizer,
            registry,
            event_bus,
            store,
            compiler,
        }
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.temp.path().join("audio")
    }

    /// Assign identities and register the build, ready for `compile`
    pub async fn prepare(&self, mut tree: IvrNode) -> (Uuid, IvrNode, CancellationToken) {
        let build_id = Uuid::new_v4();
        let total = identity::assign(&mut tree, build_id, "mp3");
        let meta = BuildMeta {
            source_name: "test.json".to_string(),
            format: "json".to_string(),
            voice_id: "test-voice".to_string(),
            created_at: Utc::now(),
        };
        self.registry.create(build_id, total, meta).await.unwrap();
        let token = self.registry.cancellation_token(build_id).await.unwrap();
        (build_id, tree, token)
    }

    pub fn runner(&self) -> BuildRunner {
        BuildRunner::new(self.compiler.clone(), self.registry.clone(), self.event_bus.clone())
    }

    /// Runner and app state backed by a database in the temporary root
    pub async fn app_state(&self) -> AppState {
        let db = ivr_compiler::db::init_database_pool(&self.temp.path().join("ivr.db"))
            .await
            .unwrap();
        let runner = self.runner().with_database(db.clone());
        AppState::new(
            db,
            self.event_bus.clone(),
            runner,
            self.store.clone(),
            self.audio_dir(),
            Duration::from_millis(10),
        )
    }
}
