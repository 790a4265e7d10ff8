//! Alert Manager
//!
//! The single authoritative alert state. Fatigue events, voice commands,
//! and button gestures arrive over the bus; LED patterns and spoken
//! warnings go out through the hardware and playback handles. Nothing else
//! mutates the state.

pub mod manager;
pub mod policy;

pub use manager::{AlertManager, Outcome};
pub use policy::{failure_notice, led_for, status_message, warning_for};

use serde::{Deserialize, Serialize};

use message_bus::FatigueLevel;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Severe warning repeat interval while unacknowledged (seconds)
    pub repeat_interval_secs: u64,
    /// Bounded wait for service shutdown acknowledgments (ms)
    pub shutdown_ack_timeout_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            repeat_interval_secs: 60,
            shutdown_ack_timeout_ms: 3000,
        }
    }
}

/// The one mutable alert entity, owned exclusively by the manager task.
///
/// `paused` is orthogonal to the level: pausing holds the last state while
/// vision processing is suspended.
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    pub level: FatigueLevel,
    pub last_transition_ms: u64,
    pub acknowledged: bool,
    pub paused: bool,
}
