//! Speech synthesis contract
//!
//! The compiler only needs "text → audio bytes" with a defined failure mode.
//! Every provider error is handled the same way: the node is left without
//! audio and the build moves on.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Provider-side synthesis failure
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Unauthorized: the TTS API key was rejected")]
    Unauthorized,

    #[error("Invalid voice: {0}")]
    InvalidVoice(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Provider returned no audio")]
    EmptyAudio,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Text-to-speech capability
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` with `voice` into audio encoded as `format`
    async fn synthesize(&self, text: &str, voice: &str, format: &str) -> Result<Bytes, SynthesisError>;
}
