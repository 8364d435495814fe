//! Services: speech synthesis providers and the build runner

pub mod build_runner;
pub mod elevenlabs_client;
pub mod synthesizer;

pub use build_runner::{BuildHandle, BuildRunner, SubmitError, Upload};
pub use elevenlabs_client::{ElevenLabsClient, Voice};
pub use synthesizer::{SpeechSynthesizer, SynthesisError};
