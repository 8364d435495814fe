//! ivr-compiler - IVR Menu Compiler service
//!
//! Accepts menu descriptions (JSON, YAML, OPML, TOML), synthesizes one audio
//! prompt per node and serves the compiled tree, live build progress and the
//! audio files.
//!
//! Default port: 5730

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ivr_common::config::{load_or_default, RootFolderInitializer, RootFolderResolver};
use ivr_common::events::EventBus;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ivr_compiler::compiler::{AudioCompiler, CompilerSettings};
use ivr_compiler::registry::BuildRegistry;
use ivr_compiler::services::{BuildRunner, ElevenLabsClient};
use ivr_compiler::storage::TreeStore;
use ivr_compiler::AppState;

const MODULE_NAME: &str = "ivr-compiler";

/// How long shutdown waits for in-flight builds to drain
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Command-line arguments for ivr-compiler
#[derive(Parser, Debug)]
#[command(name = "ivr-compiler")]
#[command(about = "Compiles IVR menu trees into audio prompts")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the TOML config)
    #[arg(short, long, env = "IVR_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides the TOML config)
    #[arg(short, long, env = "IVR_BIND_ADDRESS")]
    bind: Option<String>,

    /// Root folder for audio, finalized trees and the build database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file (default: ~/.config/ivr/ivr-compiler.toml)
    #[arg(short, long, env = "IVR_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; it carries ELEVEN_KEY / VOICE_ID in simple deployments
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();
    let config = load_or_default(args.config.as_deref(), MODULE_NAME);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ivr_compiler={0},ivr_common={0},tower_http=info", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ivr-compiler (IVR Menu Compiler) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    // Root folder: CLI → ENV → TOML → compiled default
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = ivr_compiler::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let stale = ivr_compiler::db::builds::close_stale_builds(&db_pool).await?;
    if stale > 0 {
        warn!("Closed {} build(s) interrupted by a previous shutdown", stale);
    }

    let api_key = ivr_compiler::config::resolve_tts_api_key(&config)?;
    let voice_id = ivr_compiler::config::resolve_voice_id(&config)?;
    let synthesizer = ElevenLabsClient::new(api_key, &config.tts)
        .map_err(|e| anyhow::anyhow!("Failed to create TTS client: {}", e))?;

    if config.compiler.max_concurrent_syntheses == 0 {
        warn!("compiler.max_concurrent_syntheses is 0, using 1");
    }

    let event_bus = EventBus::new(100);
    let registry = BuildRegistry::new();
    let store = TreeStore::new(initializer.builds_dir());
    let audio_dir = initializer.audio_dir();

    let settings = CompilerSettings::from_config(voice_id, &config.tts, &config.compiler);
    info!(
        voice = %settings.voice_id,
        output_format = %settings.output_format,
        max_concurrent = settings.max_concurrent,
        "Audio compiler configured"
    );

    let compiler = AudioCompiler::new(
        Arc::new(synthesizer),
        registry.clone(),
        event_bus.clone(),
        audio_dir.clone(),
        settings,
    )
    .with_tree_store(store.clone());

    let runner = BuildRunner::new(compiler, registry, event_bus.clone()).with_database(db_pool.clone());

    let state = AppState::new(
        db_pool,
        event_bus,
        runner.clone(),
        store,
        audio_dir,
        Duration::from_millis(config.compiler.progress_interval_ms.max(1)),
    );
    let app = ivr_compiler::build_router(state);

    let bind = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if !runner.shutdown(SHUTDOWN_GRACE).await {
        warn!("Builds still running after {:?}, abandoning them", SHUTDOWN_GRACE);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
