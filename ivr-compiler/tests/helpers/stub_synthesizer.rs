//! Scriptable speech synthesizer for compiler tests

use async_trait::async_trait;
use bytes::Bytes;
use ivr_compiler::services::{SpeechSynthesizer, SynthesisError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Blocks the attempt for one prompt until the test releases it
#[derive(Clone, Default)]
pub struct Gate {
    /// Notified when the gated attempt has started
    pub started: Arc<Notify>,
    /// Notify to let the gated attempt finish
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub struct StubSynthesizer {
    fail_texts: HashSet<String>,
    gate_text: Option<String>,
    gate: Gate,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every attempt whose prompt equals `text`
    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_texts.insert(text.to_string());
        self
    }

    pub fn gated_on(mut self, text: &str) -> Self {
        self.gate_text = Some(text.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn gate(&self) -> Gate {
        self.gate.clone()
    }

    /// Prompts in the order the provider was called
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &str, _format: &str) -> Result<Bytes, SynthesisError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.calls.lock().unwrap().push(text.to_string());

        if self.gate_text.as_deref() == Some(text) {
            self.gate.started.notify_one();
            self.gate.release.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_texts.contains(text) {
            Err(SynthesisError::Api(500, format!("stub failure for '{}'", text)))
        } else {
            Ok(Bytes::from(format!("audio:{}", text)))
        }
    }
}
