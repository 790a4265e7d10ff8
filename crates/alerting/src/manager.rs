//! Alert manager worker

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use audio::SpeechHandle;
use hardware_io::{LedHandle, LedPattern, Rgb};
use message_bus::{
    now_ms, Bus, CommandIntent, ControlSignal, Event, FatigueEvent, FatigueLevel, GestureKind,
    ServiceId, Subscription, Topic,
};

use crate::policy::{failure_notice, led_for, status_message, warning_for};
use crate::{AlertConfig, AlertState};

/// Why the manager returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Orderly shutdown (very-long press); process exits 0
    Shutdown,
}

/// Fuses fatigue, voice, and button events into the authoritative alert
/// state and drives LED/voice feedback.
pub struct AlertManager {
    cfg: AlertConfig,
    bus: Bus,
    led: LedHandle,
    speech: SpeechHandle,
    state: AlertState,
    /// Monotonic ms of the last audible warning
    last_warning_ms: u64,
    /// Services the user has already been told about
    notified_failures: HashSet<ServiceId>,
}

impl AlertManager {
    pub fn new(cfg: AlertConfig, bus: Bus, led: LedHandle, speech: SpeechHandle) -> Self {
        info!("alert manager created");
        Self {
            cfg,
            bus,
            led,
            speech,
            state: AlertState::default(),
            last_warning_ms: 0,
            notified_failures: HashSet::new(),
        }
    }

    /// Run until an orderly shutdown is requested
    pub async fn run(mut self) -> Outcome {
        let mut sub = self.bus.subscribe(&[
            Topic::VisionMetrics,
            Topic::VoiceCommands,
            Topic::ButtonInput,
            Topic::Control,
        ]);
        self.apply_led();

        let started = tokio::time::Instant::now();
        let mut repeat_tick = tokio::time::interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                ev = sub.recv() => {
                    let mono_ms = started.elapsed().as_millis() as u64;
                    match ev {
                        Some(Event::Fatigue(e)) => self.on_fatigue(&e, mono_ms),
                        Some(Event::Voice(cmd)) => self.on_voice(cmd.intent),
                        Some(Event::Button(g)) => {
                            if self.on_button(g.kind) {
                                self.shutdown(&mut sub).await;
                                return Outcome::Shutdown;
                            }
                        }
                        Some(Event::WakeDetected { .. }) => {
                            debug!("wake word heard, awaiting command");
                        }
                        Some(Event::Control(ControlSignal::ServiceFailed(id))) => {
                            self.on_service_failed(id);
                        }
                        Some(_) => {}
                        None => {
                            warn!("bus closed, alert manager exiting");
                            return Outcome::Shutdown;
                        }
                    }
                }
                _ = repeat_tick.tick() => {
                    self.maybe_repeat_warning(started.elapsed().as_millis() as u64);
                }
            }
        }
    }

    /// Adopt the published level directly; hysteresis already happened
    /// upstream in the vision pipeline.
    fn on_fatigue(&mut self, event: &FatigueEvent, mono_ms: u64) {
        if !event.face_detected {
            debug!("face-not-found status");
        }
        if event.level == self.state.level {
            return;
        }

        let escalating = event.level > self.state.level;
        info!(
            from = self.state.level.as_str(),
            to = event.level.as_str(),
            score = event.score,
            "alert level changed"
        );
        self.state.level = event.level;
        self.state.last_transition_ms = now_ms();
        self.state.acknowledged = false;
        self.apply_led();

        // Warnings accompany escalation only; downgrades are silent
        if escalating {
            if let Some(text) = warning_for(self.state.level) {
                if self.state.level == FatigueLevel::Severe {
                    self.speech.say_urgent(text);
                } else {
                    self.speech.say(text);
                }
                self.last_warning_ms = mono_ms;
            }
        }
    }

    fn on_voice(&mut self, intent: CommandIntent) {
        match intent {
            CommandIntent::Acknowledge => {
                if !self.acknowledge() {
                    self.speech.say("Glad to hear it. I'll continue monitoring.");
                }
            }
            CommandIntent::StatusQuery => {
                self.speech.say(status_message(&self.state));
            }
            CommandIntent::SetTimer => {
                self.speech.say("Timer feature coming soon.");
            }
            CommandIntent::StopMonitoring => {
                if !self.state.paused {
                    self.set_paused(true);
                }
            }
            CommandIntent::Unrecognized => {
                self.speech.say("Sorry, I didn't understand that.");
            }
        }
    }

    /// Returns true when an orderly shutdown was requested
    fn on_button(&mut self, kind: GestureKind) -> bool {
        match kind {
            GestureKind::Single => {
                if self.state.paused {
                    self.set_paused(false);
                } else if self.state.level > FatigueLevel::Normal {
                    self.acknowledge();
                } else {
                    debug!("single press with no active alert");
                }
                false
            }
            GestureKind::Double => {
                self.speech.say(status_message(&self.state));
                false
            }
            GestureKind::Long => {
                let paused = self.state.paused;
                self.set_paused(!paused);
                false
            }
            GestureKind::VeryLong => true,
        }
    }

    /// Mark the active alert acknowledged. Never changes the level; only a
    /// lower-level FatigueEvent downgrades.
    fn acknowledge(&mut self) -> bool {
        if self.state.level == FatigueLevel::Normal || self.state.acknowledged {
            return false;
        }
        self.state.acknowledged = true;
        info!(level = self.state.level.as_str(), "alert acknowledged");
        self.speech.say("Alert dismissed.");
        true
    }

    fn set_paused(&mut self, paused: bool) {
        self.state.paused = paused;
        if paused {
            info!("monitoring paused");
            self.bus.publish(Event::Control(ControlSignal::Pause));
            self.speech
                .say("Monitoring paused. Press the button to resume.");
        } else {
            info!("monitoring resumed");
            self.bus.publish(Event::Control(ControlSignal::Resume));
            self.speech.say("Monitoring resumed.");
        }
    }

    /// Severe alerts repeat audibly until acknowledged or downgraded
    fn maybe_repeat_warning(&mut self, mono_ms: u64) {
        if self.state.level != FatigueLevel::Severe
            || self.state.acknowledged
            || self.state.paused
        {
            return;
        }
        if mono_ms.saturating_sub(self.last_warning_ms) < self.cfg.repeat_interval_secs * 1000 {
            return;
        }
        if let Some(text) = warning_for(FatigueLevel::Severe) {
            self.speech.say_urgent(text);
            self.last_warning_ms = mono_ms;
        }
    }

    /// Degraded mode: the failed capability is visibly disabled, the rest
    /// keeps running.
    fn on_service_failed(&mut self, id: ServiceId) {
        if !self.notified_failures.insert(id) {
            return;
        }
        warn!(service = id.as_str(), "service failed permanently");
        self.led.set(LedPattern::Off, Rgb::BLACK);
        self.speech.say(failure_notice(id));
    }

    fn apply_led(&self) {
        let (pattern, color) = led_for(self.state.level);
        self.led.set(pattern, color);
    }

    async fn shutdown(&mut self, sub: &mut Subscription) {
        info!("shutdown requested");
        self.speech.say_urgent("Shutting down. Goodbye.");
        self.bus.publish(Event::Control(ControlSignal::Shutdown));

        let deadline = tokio::time::Instant::now()
            + Duration::from_millis(self.cfg.shutdown_ack_timeout_ms);
        let mut pending: HashSet<ServiceId> =
            [ServiceId::Vision, ServiceId::Audio].into_iter().collect();

        while !pending.is_empty() {
            match tokio::time::timeout_at(deadline, sub.recv()).await {
                Ok(Some(Event::Control(ControlSignal::ShutdownAck(id)))) => {
                    debug!(service = id.as_str(), "shutdown acknowledged");
                    pending.remove(&id);
                }
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) => {
                    warn!(?pending, "shutdown acknowledgments missing, proceeding");
                    break;
                }
            }
        }

        self.led.set(LedPattern::Off, Rgb::BLACK);
        info!("shutdown complete");
    }
}
