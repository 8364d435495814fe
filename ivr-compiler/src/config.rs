//! Credential resolution for ivr-compiler
//!
//! Priority for both the TTS API key and the voice: ENV → TOML.

use ivr_common::config::TomlConfig;
use ivr_common::{Error, Result};
use tracing::{info, warn};

/// Environment variables holding the TTS API key, in priority order
pub const API_KEY_ENV_VARS: [&str; 2] = ["IVR_TTS_API_KEY", "ELEVEN_KEY"];

/// Environment variables holding the voice id, in priority order
pub const VOICE_ID_ENV_VARS: [&str; 2] = ["IVR_VOICE_ID", "VOICE_ID"];

/// Validate a credential (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// First valid value among `env_vars`, with the variable it came from
fn from_env(env_vars: &[&'static str]) -> Option<(&'static str, String)> {
    env_vars.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .filter(|value| is_valid_key(value))
            .map(|value| (*name, value.trim().to_string()))
    })
}

fn resolve(label: &str, env_vars: &[&'static str], toml_value: Option<&String>) -> Option<String> {
    let env_value = from_env(env_vars);
    let toml_value = toml_value.filter(|value| is_valid_key(value));

    if env_value.is_some() && toml_value.is_some() {
        warn!("{} found in both environment and TOML config. Using environment (highest priority).", label);
    }

    if let Some((name, value)) = env_value {
        info!("{} loaded from environment variable {}", label, name);
        return Some(value);
    }

    toml_value.map(|value| {
        info!("{} loaded from TOML config", label);
        value.trim().to_string()
    })
}

/// Resolve the TTS provider API key
pub fn resolve_tts_api_key(toml_config: &TomlConfig) -> Result<String> {
    resolve("TTS API key", &API_KEY_ENV_VARS, toml_config.tts.api_key.as_ref()).ok_or_else(|| {
        Error::Config(
            "TTS API key not configured. Please configure using one of:\n\
             1. Environment: IVR_TTS_API_KEY=your-key (or ELEVEN_KEY)\n\
             2. TOML config: ~/.config/ivr/ivr-compiler.toml ([tts] api_key = \"your-key\")"
                .to_string(),
        )
    })
}

/// Resolve the voice used for every node
pub fn resolve_voice_id(toml_config: &TomlConfig) -> Result<String> {
    resolve("Voice id", &VOICE_ID_ENV_VARS, toml_config.tts.voice_id.as_ref()).ok_or_else(|| {
        Error::Config(
            "Voice not configured. Set IVR_VOICE_ID (or VOICE_ID), or [tts] voice_id in the TOML \
             config. Run ivr-voices to list available voices."
                .to_string(),
        )
    })
}
