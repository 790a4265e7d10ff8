//! Hardware I/O
//!
//! Drives the mirror's RGB status LED and classifies raw button edges into
//! gestures. The physical GPIO/PWM layer is an external collaborator behind
//! the [`LedBackend`] trait; without real hardware the crate runs against a
//! logging backend, the same way the original appliance falls back to
//! simulation mode.

pub mod button;
pub mod led;

pub use button::{spawn_button_worker, ButtonConfig, ButtonEdge, GestureDetector};
pub use led::{
    spawn_led_controller, LedBackend, LedCommand, LedConfig, LedHandle, LedPattern,
    LoggingLedBackend, Rgb,
};

use thiserror::Error;

/// Hardware error types
#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("LED backend failure: {0}")]
    Led(String),

    #[error("Button input closed")]
    ButtonClosed,
}
