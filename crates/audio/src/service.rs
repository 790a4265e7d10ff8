//! Audio service worker

use std::time::Duration;

use tracing::{debug, info};

use message_bus::{
    now_ms, Bus, CommandIntent, ControlSignal, Event, Heartbeat, ServiceId, Topic, VoiceCommand,
};

use crate::backend::{
    AudioInput, DisabledStt, DisabledWakeWord, SpeechToText, SyntheticMicrophone, WakeWordDetector,
};
use crate::intent::parse_intent;
use crate::listen::ListenController;
use crate::{AudioConfig, AudioError};

/// Wake scanning and command transcription over one input stream.
///
/// The two phases are mutually exclusive; the [`ListenController`]
/// guarantees the listening window always closes. The service keeps
/// scanning while the system is paused so a wake word can still reach the
/// alert manager.
pub struct AudioService {
    cfg: AudioConfig,
    bus: Bus,
    input: Box<dyn AudioInput>,
    wake: Box<dyn WakeWordDetector>,
    stt: Box<dyn SpeechToText>,
    listen: ListenController,
    miss_count: u64,
}

impl AudioService {
    pub fn new(
        cfg: AudioConfig,
        bus: Bus,
        input: Box<dyn AudioInput>,
        wake: Box<dyn WakeWordDetector>,
        stt: Box<dyn SpeechToText>,
    ) -> Self {
        let listen = ListenController::new(cfg.listen_window_secs);
        Self {
            cfg,
            bus,
            input,
            wake,
            stt,
            listen,
            miss_count: 0,
        }
    }

    /// A service wired to the built-in silence source and disabled models
    pub fn simulated(cfg: AudioConfig, bus: Bus) -> Self {
        let mic = SyntheticMicrophone::new(cfg.sample_rate, cfg.chunk_ms);
        Self::new(
            cfg,
            bus,
            Box::new(mic),
            Box::new(DisabledWakeWord),
            Box::new(DisabledStt),
        )
    }

    /// Run until shutdown. Microphone open failure is fatal; the
    /// supervisor restarts the service with backoff.
    pub async fn run(mut self) -> Result<(), AudioError> {
        self.input.open()?;
        info!(
            sensitivity = self.cfg.wake_sensitivity,
            listen_window_secs = self.cfg.listen_window_secs,
            "audio service started"
        );

        let mut ctrl = self.bus.subscribe(&[Topic::Control]);
        let mut chunk_tick =
            tokio::time::interval(Duration::from_millis(self.cfg.chunk_ms.max(1)));
        chunk_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut heartbeat =
            tokio::time::interval(Duration::from_millis(self.cfg.heartbeat_interval_ms.max(100)));
        // Monotonic clock for the listening deadline; wall time only goes
        // into published event timestamps.
        let started = tokio::time::Instant::now();

        loop {
            tokio::select! {
                ev = ctrl.recv() => {
                    match ev {
                        Some(Event::Control(ControlSignal::Shutdown)) | None => {
                            self.bus.publish(Event::Control(ControlSignal::ShutdownAck(
                                ServiceId::Audio,
                            )));
                            break;
                        }
                        // Pause only suspends vision; scanning continues
                        _ => {}
                    }
                }
                _ = heartbeat.tick() => {
                    self.bus.publish(Event::Heartbeat(Heartbeat {
                        service: ServiceId::Audio,
                        timestamp_ms: now_ms(),
                    }));
                }
                _ = chunk_tick.tick() => {
                    self.process_chunk(started.elapsed().as_millis() as u64);
                }
            }
        }

        self.input.close();
        info!(misses = self.miss_count, "audio service stopped");
        Ok(())
    }

    fn process_chunk(&mut self, mono_ms: u64) {
        let chunk = match self.input.read_chunk() {
            Ok(chunk) => chunk,
            Err(e) => {
                // Transient: one bad chunk never kills the loop
                self.miss_count += 1;
                debug!(error = %e, "chunk capture failed");
                return;
            }
        };

        if self.listen.is_listening() {
            if let Some(text) = self.stt.accept_chunk(&chunk) {
                let intent = parse_intent(&text);
                info!(transcript = %text, ?intent, "command recognized");
                self.listen.complete();
                self.publish_command(intent);
            } else if self.listen.expired(mono_ms) {
                let intent = match self.stt.finalize() {
                    Some(text) => {
                        info!(transcript = %text, "command recognized at window close");
                        parse_intent(&text)
                    }
                    None => CommandIntent::Unrecognized,
                };
                self.publish_command(intent);
            }
        } else {
            let confidence = self.wake.process(&chunk);
            if confidence as f64 >= 1.0 - self.cfg.wake_sensitivity {
                info!(confidence, "wake word detected");
                self.bus.publish(Event::WakeDetected {
                    timestamp_ms: now_ms(),
                });
                self.stt.reset();
                self.listen.wake(mono_ms);
            }
        }
    }

    fn publish_command(&self, intent: CommandIntent) {
        self.bus.publish(Event::Voice(VoiceCommand {
            intent,
            timestamp_ms: now_ms(),
        }));
    }
}
