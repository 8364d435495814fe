//! ivr-compiler library interface
//!
//! Compiles IVR menu descriptions into trees of audio prompts. Exposed as a
//! library for the binaries and the integration tests.

pub mod api;
pub mod compiler;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod ingest;
pub mod models;
pub mod registry;
pub mod services;
pub mod storage;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use ivr_common::events::EventBus;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::registry::BuildRegistry;
use crate::services::BuildRunner;
use crate::storage::TreeStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Build history
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub registry: BuildRegistry,
    pub runner: BuildRunner,
    /// Persisted finalized trees
    pub store: TreeStore,
    /// Directory served under `/audio`
    pub audio_dir: PathBuf,
    /// Cadence of `/progress/:id` snapshots
    pub progress_interval: Duration,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        runner: BuildRunner,
        store: TreeStore,
        audio_dir: impl Into<PathBuf>,
        progress_interval: Duration,
    ) -> Self {
        Self {
            db,
            event_bus,
            registry: runner.registry().clone(),
            runner,
            store,
            audio_dir: audio_dir.into(),
            progress_interval,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let audio = ServeDir::new(&state.audio_dir);

    Router::new()
        .merge(api::upload_routes())
        .route("/progress/:id", get(api::progress_stream))
        .merge(api::tree_routes())
        .merge(api::build_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .nest_service("/audio", audio)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
