//! ivr-voices - list the voices available to the configured TTS account
//!
//! Prints each voice name with its id; pick one for `IVR_VOICE_ID`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use ivr_common::config::load_or_default;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ivr_compiler::services::ElevenLabsClient;

#[derive(Parser, Debug)]
#[command(name = "ivr-voices")]
#[command(about = "List TTS voices available to the configured API key")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/ivr/ivr-compiler.toml)
    #[arg(short, long, env = "IVR_CONFIG")]
    config: Option<PathBuf>,

    /// Print the raw JSON voice list
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = load_or_default(args.config.as_deref(), "ivr-compiler");

    let api_key = ivr_compiler::config::resolve_tts_api_key(&config)?;
    let client = ElevenLabsClient::new(api_key, &config.tts)?;
    let voices = client.list_voices().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&voices)?);
        return Ok(());
    }

    for voice in &voices {
        println!("{} \u{2014} {}", voice.name, voice.voice_id);
    }
    Ok(())
}
