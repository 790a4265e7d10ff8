//! Audio Pipeline
//!
//! One logical worker over a single microphone stream:
//! - Continuous wake-word scanning
//! - Command transcription inside a bounded listening window
//! - On-demand speech synthesis through a serialized playback queue
//!
//! Wake scanning and transcription are mutually exclusive phases of the
//! same loop; they never contend for the input device.

pub mod backend;
pub mod intent;
pub mod listen;
pub mod service;
pub mod speech;

pub use backend::{
    AudioChunk, AudioInput, DisabledStt, DisabledWakeWord, SimulatedTts, SpeechToText,
    SyntheticMicrophone, TextToSpeech, WakeWordDetector,
};
pub use intent::parse_intent;
pub use listen::{ListenController, ListenPhase};
pub use service::AudioService;
pub use speech::{spawn_playback, SpeechHandle, SpeechRequest};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to open audio input: {0}")]
    InputOpen(String),

    #[error("Audio capture failed: {0}")]
    Capture(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),
}

/// Audio pipeline configuration snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Input sample rate (Hz)
    pub sample_rate: u32,
    /// Audio chunk length (ms)
    pub chunk_ms: u64,
    /// Wake sensitivity, 0.0 - 1.0; higher detects more readily (the
    /// classifier confidence threshold is `1.0 - sensitivity`)
    pub wake_sensitivity: f64,
    /// Hard cap on the command listening window (seconds)
    pub listen_window_secs: u64,
    /// Playback queue depth before new utterances are dropped
    pub speech_queue_depth: usize,
    /// Heartbeat interval (ms)
    pub heartbeat_interval_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_ms: 32,
            wake_sensitivity: 0.5,
            listen_window_secs: 5,
            speech_queue_depth: 16,
            heartbeat_interval_ms: 1000,
        }
    }
}
