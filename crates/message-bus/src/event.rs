//! Event model shared by every service

use serde::{Deserialize, Serialize};

/// Current UNIX time in milliseconds
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Bus topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Fatigue metrics and face status from the vision service
    VisionMetrics,
    /// Wake detections and recognized commands from the audio service
    VoiceCommands,
    /// Debounced button gestures
    ButtonInput,
    /// Service liveness proofs
    Heartbeats,
    /// Pause/resume/shutdown coordination
    Control,
}

/// Discrete fatigue level derived from the PERCLOS window
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum FatigueLevel {
    #[default]
    Normal,
    Mild,
    Severe,
}

impl FatigueLevel {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FatigueLevel::Normal => "normal",
            FatigueLevel::Mild => "mild",
            FatigueLevel::Severe => "severe",
        }
    }
}

/// Fatigue state sample published by the vision service.
///
/// `face_detected = false` marks the reduced-frequency face-not-found
/// status; the level field stays authoritative either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueEvent {
    pub level: FatigueLevel,
    /// PERCLOS value the level was derived from (0.0 - 1.0)
    pub score: f64,
    pub face_detected: bool,
    pub timestamp_ms: u64,
}

/// Fixed voice command vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandIntent {
    StatusQuery,
    Acknowledge,
    SetTimer,
    StopMonitoring,
    Unrecognized,
}

/// A recognized (or unrecognized) spoken command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceCommand {
    pub intent: CommandIntent,
    pub timestamp_ms: u64,
}

/// Debounced button gesture kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureKind {
    Single,
    Double,
    Long,
    VeryLong,
}

/// A classified button gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonGesture {
    pub kind: GestureKind,
    pub timestamp_ms: u64,
}

/// Long-running services tracked by the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceId {
    Vision,
    Audio,
}

impl ServiceId {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::Vision => "vision",
            ServiceId::Audio => "audio",
        }
    }
}

/// Liveness proof emitted by each service at a fixed interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub service: ServiceId,
    pub timestamp_ms: u64,
}

/// Cross-service coordination signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlSignal {
    /// Suspend vision processing (audio keeps scanning)
    Pause,
    /// Resume vision processing
    Resume,
    /// Orderly shutdown of all services
    Shutdown,
    /// A service confirming it observed Shutdown
    ShutdownAck(ServiceId),
    /// Supervisor gave up restarting a service
    ServiceFailed(ServiceId),
}

/// Everything that travels on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Fatigue(FatigueEvent),
    WakeDetected { timestamp_ms: u64 },
    Voice(VoiceCommand),
    Button(ButtonGesture),
    Heartbeat(Heartbeat),
    Control(ControlSignal),
}

impl Event {
    /// The topic this event is published under
    pub fn topic(&self) -> Topic {
        match self {
            Event::Fatigue(_) => Topic::VisionMetrics,
            Event::WakeDetected { .. } | Event::Voice(_) => Topic::VoiceCommands,
            Event::Button(_) => Topic::ButtonInput,
            Event::Heartbeat(_) => Topic::Heartbeats,
            Event::Control(_) => Topic::Control,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(FatigueLevel::Normal < FatigueLevel::Mild);
        assert!(FatigueLevel::Mild < FatigueLevel::Severe);
    }

    #[test]
    fn test_event_topics() {
        let fatigue = Event::Fatigue(FatigueEvent {
            level: FatigueLevel::Mild,
            score: 0.3,
            face_detected: true,
            timestamp_ms: 0,
        });
        assert_eq!(fatigue.topic(), Topic::VisionMetrics);

        let wake = Event::WakeDetected { timestamp_ms: 0 };
        assert_eq!(wake.topic(), Topic::VoiceCommands);

        let hb = Event::Heartbeat(Heartbeat {
            service: ServiceId::Vision,
            timestamp_ms: 0,
        });
        assert_eq!(hb.topic(), Topic::Heartbeats);
    }
}
