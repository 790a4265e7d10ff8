//! Message Bus
//!
//! Asynchronous, topic-addressed transport connecting the monitoring
//! services:
//! - Vision publishes fatigue metrics
//! - Audio publishes wake/command events
//! - Hardware I/O publishes button gestures
//! - The alert manager and supervisor subscribe by topic
//!
//! Delivery is at-most-once: a late-joining subscriber misses everything
//! published before it attached, and a slow subscriber loses its oldest
//! undelivered events rather than blocking the producer.

pub mod bus;
pub mod event;

pub use bus::{Bus, Subscription};
pub use event::{
    now_ms, ButtonGesture, CommandIntent, ControlSignal, Event, FatigueEvent, FatigueLevel,
    GestureKind, Heartbeat, ServiceId, Topic, VoiceCommand,
};
