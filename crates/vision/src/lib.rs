//! Vision Pipeline
//!
//! Turns camera frames into a fatigue signal:
//! - Face detection and landmark extraction (external model contracts)
//! - Eye/mouth aperture ratios (EAR/MAR)
//! - PERCLOS over a trailing time window
//! - Discrete fatigue level with hysteresis

pub mod camera;
pub mod detect;
pub mod fatigue;
pub mod frame;
pub mod metrics;
pub mod service;

pub use camera::{FrameSource, SyntheticCamera};
pub use detect::{FaceBox, FaceDetector, LandmarkExtractor, SimulatedDetector};
pub use fatigue::{FatigueSample, FatigueThresholds, FatigueWindow, LevelMapper};
pub use frame::Frame;
pub use metrics::LandmarkSet;
pub use service::VisionService;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Vision error types
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Failed to open camera: {0}")]
    CameraOpen(String),

    #[error("Frame capture failed: {0}")]
    Capture(String),

    #[error("Invalid landmark set")]
    Landmarks,
}

/// Vision pipeline configuration snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target frame rate
    pub fps: u32,
    /// Analyze every Nth frame (1 = every frame)
    pub frame_skip: u32,
    /// EAR below this counts as eyes closed
    pub ear_threshold: f64,
    /// MAR above this counts as a yawn
    pub mar_threshold: f64,
    /// Trailing PERCLOS window length (seconds)
    pub perclos_window_secs: u64,
    /// Level escalation/de-escalation thresholds
    pub thresholds: FatigueThresholds,
    /// Periodic status publication interval (seconds)
    pub status_interval_secs: u64,
    /// Reduced-frequency face-not-found status interval (seconds)
    pub face_missing_interval_secs: u64,
    /// Heartbeat interval (ms)
    pub heartbeat_interval_ms: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 15,
            frame_skip: 2,
            ear_threshold: 0.21,
            mar_threshold: 0.6,
            perclos_window_secs: 60,
            thresholds: FatigueThresholds::default(),
            status_interval_secs: 5,
            face_missing_interval_secs: 2,
            heartbeat_interval_ms: 1000,
        }
    }
}
