//! ElevenLabs text-to-speech client
//!
//! `POST /v1/text-to-speech/{voice_id}?output_format=...` with the
//! `xi-api-key` header, client-side rate limited so a large menu does not
//! trip the provider's concurrency ceiling.

use async_trait::async_trait;
use bytes::Bytes;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use ivr_common::config::TtsConfig;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

use super::synthesizer::{SpeechSynthesizer, SynthesisError};

const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
const XI_API_KEY_HEADER: &str = "xi-api-key";
const USER_AGENT: &str = concat!("ivr-compiler/", env!("CARGO_PKG_VERSION"));

/// Request body of the text-to-speech endpoint
#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// One entry of `GET /v1/voices`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<Voice>,
}

/// ElevenLabs API client
pub struct ElevenLabsClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model_id: String,
    rate_limiter: DefaultDirectRateLimiter,
}

impl ElevenLabsClient {
    pub fn new(api_key: impl Into<String>, config: &TtsConfig) -> Result<Self, SynthesisError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            base_url: ELEVENLABS_BASE_URL.to_string(),
            api_key: api_key.into(),
            model_id: config.model_id.clone(),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    /// Point the client at another host (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn tts_url(&self, voice: &str, format: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{}?output_format={}",
            self.base_url, voice, format
        )
    }

    /// Voices available to the configured account
    pub async fn list_voices(&self) -> Result<Vec<Voice>, SynthesisError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/v1/voices", self.base_url);
        tracing::debug!(url = %url, "Listing ElevenLabs voices");

        let response = self
            .http_client
            .get(&url)
            .header(XI_API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, body, ""));
        }

        let voices: VoicesResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Parse(e.to_string()))?;

        Ok(voices.voices)
    }
}

/// Map a non-success HTTP status to a synthesis error
fn classify_failure(status: u16, body: String, voice: &str) -> SynthesisError {
    match status {
        401 | 403 => SynthesisError::Unauthorized,
        404 => SynthesisError::InvalidVoice(voice.to_string()),
        429 => SynthesisError::RateLimited,
        _ => SynthesisError::Api(status, body),
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice: &str, format: &str) -> Result<Bytes, SynthesisError> {
        self.rate_limiter.until_ready().await;

        let url = self.tts_url(voice, format);
        tracing::debug!(voice = %voice, chars = text.len(), "Requesting ElevenLabs synthesis");

        let response = self
            .http_client
            .post(&url)
            .header(XI_API_KEY_HEADER, &self.api_key)
            .json(&TtsRequest {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, body = %body, "ElevenLabs rejected synthesis request");
            return Err(classify_failure(status, body, voice));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Network(e.to_string()))?;

        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ElevenLabsClient::new("key", &TtsConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        let config = TtsConfig {
            requests_per_second: 0,
            ..TtsConfig::default()
        };
        assert!(ElevenLabsClient::new("key", &config).is_ok());
    }

    #[test]
    fn test_tts_url() {
        let client = ElevenLabsClient::new("key", &TtsConfig::default())
            .unwrap()
            .with_base_url("http://localhost:9000/");
        assert_eq!(
            client.tts_url("voice-1", "mp3_44100_128"),
            "http://localhost:9000/v1/text-to-speech/voice-1?output_format=mp3_44100_128"
        );
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(classify_failure(401, String::new(), "v"), SynthesisError::Unauthorized));
        assert!(matches!(classify_failure(429, String::new(), "v"), SynthesisError::RateLimited));
        assert!(matches!(
            classify_failure(404, String::new(), "v"),
            SynthesisError::InvalidVoice(ref voice) if voice == "v"
        ));
        assert!(matches!(classify_failure(500, "boom".into(), "v"), SynthesisError::Api(500, _)));
    }

    #[test]
    fn test_voices_response_parsing() {
        let parsed: VoicesResponse = serde_json::from_str(
            r#"{"voices": [{"voice_id": "abc", "name": "Rachel", "category": "premade", "labels": {}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.voices[0].name, "Rachel");
        assert_eq!(parsed.voices[0].voice_id, "abc");
    }
}
