//! Serialized speech playback queue
//!
//! At most one utterance plays at a time. Normal requests queue FIFO; an
//! urgent request cuts the current utterance (barge-in) and plays next.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::TextToSpeech;

/// A playback request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub urgent: bool,
}

/// Non-blocking handle to the playback task
#[derive(Clone)]
pub struct SpeechHandle {
    tx: mpsc::Sender<SpeechRequest>,
    urgent_tx: mpsc::Sender<SpeechRequest>,
}

impl SpeechHandle {
    /// Queue an utterance; drops with a warning if the queue is full
    pub fn say(&self, text: impl Into<String>) {
        let req = SpeechRequest {
            text: text.into(),
            urgent: false,
        };
        if self.tx.try_send(req).is_err() {
            warn!("speech queue full, dropping utterance");
        }
    }

    /// Queue an urgent utterance that interrupts current playback
    pub fn say_urgent(&self, text: impl Into<String>) {
        let req = SpeechRequest {
            text: text.into(),
            urgent: true,
        };
        if self.urgent_tx.try_send(req).is_err() {
            warn!("urgent speech queue full, dropping utterance");
        }
    }

    /// A detached handle + receiver pair, for inspecting requests in tests
    pub fn channel(depth: usize) -> (
        SpeechHandle,
        mpsc::Receiver<SpeechRequest>,
        mpsc::Receiver<SpeechRequest>,
    ) {
        let (tx, rx) = mpsc::channel(depth);
        let (urgent_tx, urgent_rx) = mpsc::channel(depth);
        (SpeechHandle { tx, urgent_tx }, rx, urgent_rx)
    }
}

/// Spawn the single-consumer playback task
pub fn spawn_playback(
    mut tts: Box<dyn TextToSpeech>,
    depth: usize,
) -> (SpeechHandle, JoinHandle<()>) {
    let (handle, mut rx, mut urgent_rx) = SpeechHandle::channel(depth.max(1));

    let task = tokio::spawn(async move {
        let mut pending: Option<SpeechRequest> = None;
        loop {
            let req = match pending.take() {
                Some(req) => req,
                None => {
                    tokio::select! {
                        biased;
                        req = urgent_rx.recv() => match req {
                            Some(req) => req,
                            None => break,
                        },
                        req = rx.recv() => match req {
                            Some(req) => req,
                            None => break,
                        },
                    }
                }
            };

            let duration = match tts.synthesize(&req.text) {
                Ok(d) => d,
                Err(e) => {
                    warn!(error = %e, "speech synthesis failed");
                    continue;
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                next = urgent_rx.recv() => {
                    if let Some(next) = next {
                        info!("urgent utterance, cutting current playback");
                        tts.stop();
                        pending = Some(next);
                    }
                }
            }
        }
    });

    (handle, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AudioError;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct RecordingTts {
        spoken: Arc<Mutex<Vec<String>>>,
        stops: Arc<Mutex<u32>>,
        duration: Duration,
    }

    impl TextToSpeech for RecordingTts {
        fn synthesize(&mut self, text: &str) -> Result<Duration, AudioError> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(self.duration)
        }

        fn stop(&mut self) {
            *self.stops.lock().unwrap() += 1;
        }
    }

    fn recorder(duration: Duration) -> (Box<RecordingTts>, Arc<Mutex<Vec<String>>>, Arc<Mutex<u32>>) {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let stops = Arc::new(Mutex::new(0));
        (
            Box::new(RecordingTts {
                spoken: spoken.clone(),
                stops: stops.clone(),
                duration,
            }),
            spoken,
            stops,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_play_in_order() {
        let (tts, spoken, _) = recorder(Duration::from_millis(500));
        let (handle, _task) = spawn_playback(tts, 8);

        handle.say("first");
        handle.say("second");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*spoken.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_urgent_cuts_current_playback() {
        let (tts, spoken, stops) = recorder(Duration::from_secs(10));
        let (handle, _task) = spawn_playback(tts, 8);

        handle.say("long story");
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.say_urgent("shutting down");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            *spoken.lock().unwrap(),
            vec!["long story", "shutting down"]
        );
        assert_eq!(*stops.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_requests_do_not_interrupt() {
        let (tts, spoken, stops) = recorder(Duration::from_secs(1));
        let (handle, _task) = spawn_playback(tts, 8);

        handle.say("first");
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.say("second");
        tokio::time::sleep(Duration::from_millis(500)).await;

        // Still mid-utterance: the second request is queued, not played
        assert_eq!(*spoken.lock().unwrap(), vec!["first"]);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*spoken.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(*stops.lock().unwrap(), 0);
    }
}
