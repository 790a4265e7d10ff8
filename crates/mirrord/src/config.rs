//! Configuration snapshot
//!
//! Assembled once at startup from an optional file plus `MIRROR_`-prefixed
//! environment overrides; immutable afterwards. Hot reload is out of scope.

use std::path::Path;

use serde::Deserialize;

use alerting::AlertConfig;
use audio::AudioConfig;
use hardware_io::{ButtonConfig, LedConfig};
use supervisor::SupervisorConfig;
use vision::VisionConfig;

/// Full configuration snapshot for the appliance
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Per-subscriber bus queue depth
    pub bus_capacity: usize,
    pub vision: VisionConfig,
    pub audio: AudioConfig,
    pub alerts: AlertConfig,
    pub led: LedConfig,
    pub button: ButtonConfig,
    pub supervisor: SupervisorConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            bus_capacity: 256,
            vision: VisionConfig::default(),
            audio: AudioConfig::default(),
            alerts: AlertConfig::default(),
            led: LedConfig::default(),
            button: ButtonConfig::default(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

/// Load the snapshot. With no explicit path, `mirror.{toml,yaml,json}` in
/// the working directory is used when present.
pub fn load(path: Option<&Path>) -> Result<MirrorConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    builder = match path {
        Some(path) => builder.add_source(config::File::from(path)),
        None => builder.add_source(config::File::with_name("mirror").required(false)),
    };

    builder = builder.add_source(config::Environment::with_prefix("MIRROR").separator("__"));

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = load(None).unwrap();
        assert_eq!(cfg.vision.fps, 15);
        assert_eq!(cfg.audio.listen_window_secs, 5);
        assert_eq!(cfg.supervisor.silence_multiplier, 3);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(load(Some(Path::new("/nonexistent/mirror.toml"))).is_err());
    }
}
