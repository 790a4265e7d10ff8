//! Mirror appliance daemon
//!
//! Wires the bus, hardware I/O, vision/audio services, alert manager, and
//! supervisor together, and provides the self-test CLI entry modes.

pub mod app;
pub mod config;
pub mod selftest;

pub use config::MirrorConfig;

use tracing_subscriber::EnvFilter;

/// Initialize structured logging (RUST_LOG overrides, info default)
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
