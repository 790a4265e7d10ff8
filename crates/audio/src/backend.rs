//! Audio backend contracts
//!
//! The wake-word classifier, speech-to-text engine, and TTS engine are
//! external, replaceable components. The built-in implementations mirror
//! how the original appliance degrades when an engine is unavailable: the
//! loop keeps running, detections simply never fire.

use std::time::Duration;

use tracing::{debug, info};

use crate::AudioError;
use message_bus::now_ms;

/// One microphone chunk (mono PCM)
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<i16>,
    pub timestamp_ms: u64,
}

/// Exclusive microphone ownership for the lifetime of the audio service.
///
/// Implementations must keep `read_chunk` time-bounded so a stop request
/// is observed within one chunk duration.
pub trait AudioInput: Send {
    /// Acquire the device. Failure here is fatal to the service.
    fn open(&mut self) -> Result<(), AudioError>;

    /// Capture the next chunk
    fn read_chunk(&mut self) -> Result<AudioChunk, AudioError>;

    /// Release the device
    fn close(&mut self) {}
}

/// Silence source used when no microphone hardware is attached
pub struct SyntheticMicrophone {
    chunk_len: usize,
    opened: bool,
}

impl SyntheticMicrophone {
    pub fn new(sample_rate: u32, chunk_ms: u64) -> Self {
        Self {
            chunk_len: (sample_rate as u64 * chunk_ms / 1000) as usize,
            opened: false,
        }
    }
}

impl AudioInput for SyntheticMicrophone {
    fn open(&mut self) -> Result<(), AudioError> {
        self.opened = true;
        info!(chunk_len = self.chunk_len, "synthetic microphone opened");
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<AudioChunk, AudioError> {
        if !self.opened {
            return Err(AudioError::Capture("microphone not opened".into()));
        }
        Ok(AudioChunk {
            samples: vec![0; self.chunk_len],
            timestamp_ms: now_ms(),
        })
    }

    fn close(&mut self) {
        self.opened = false;
        info!("synthetic microphone closed");
    }
}

/// Wake-word classifier contract: chunk in, confidence (0.0 - 1.0) out
pub trait WakeWordDetector: Send {
    fn process(&mut self, chunk: &AudioChunk) -> f32;
}

/// Stand-in when no wake model is configured; never detects
pub struct DisabledWakeWord;

impl WakeWordDetector for DisabledWakeWord {
    fn process(&mut self, _chunk: &AudioChunk) -> f32 {
        0.0
    }
}

/// Speech-to-text contract. `accept_chunk` returns a transcript once the
/// engine considers the utterance final; `finalize` flushes whatever was
/// heard when the listening window closes.
pub trait SpeechToText: Send {
    fn accept_chunk(&mut self, chunk: &AudioChunk) -> Option<String>;
    fn finalize(&mut self) -> Option<String>;
    fn reset(&mut self);
}

/// Stand-in when no ASR model is configured; never transcribes
pub struct DisabledStt;

impl SpeechToText for DisabledStt {
    fn accept_chunk(&mut self, _chunk: &AudioChunk) -> Option<String> {
        None
    }

    fn finalize(&mut self) -> Option<String> {
        None
    }

    fn reset(&mut self) {}
}

/// Text-to-speech contract. `synthesize` starts playback and returns the
/// expected utterance duration; `stop` cuts playback on barge-in.
pub trait TextToSpeech: Send {
    fn synthesize(&mut self, text: &str) -> Result<Duration, AudioError>;

    fn stop(&mut self) {}
}

/// Logs utterances instead of playing them; duration scales with length
pub struct SimulatedTts {
    pub ms_per_char: u64,
}

impl Default for SimulatedTts {
    fn default() -> Self {
        Self { ms_per_char: 60 }
    }
}

impl TextToSpeech for SimulatedTts {
    fn synthesize(&mut self, text: &str) -> Result<Duration, AudioError> {
        info!(utterance = text, "tts");
        Ok(Duration::from_millis(
            self.ms_per_char * text.chars().count() as u64,
        ))
    }

    fn stop(&mut self) {
        debug!("tts playback cut");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microphone_chunk_length() {
        let mut mic = SyntheticMicrophone::new(16_000, 32);
        assert!(mic.read_chunk().is_err());
        mic.open().unwrap();
        assert_eq!(mic.read_chunk().unwrap().samples.len(), 512);
    }

    #[test]
    fn test_simulated_tts_duration_scales() {
        let mut tts = SimulatedTts { ms_per_char: 10 };
        let d = tts.synthesize("hello").unwrap();
        assert_eq!(d, Duration::from_millis(50));
    }
}
