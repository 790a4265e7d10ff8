//! Face and landmark detection contracts
//!
//! The actual detector and landmark models are external, replaceable
//! components; the pipeline only depends on these traits. The simulated
//! backend stands in until real models are wired up.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::frame::Frame;
use crate::metrics::{LandmarkSet, Point, LANDMARK_COUNT};

/// Face bounding box
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Face detection contract: frame in, bounding box or nothing out
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Option<FaceBox>;
}

/// Landmark extraction contract: frame + face box in, 68 keypoints out
pub trait LandmarkExtractor: Send {
    fn extract(&mut self, frame: &Frame, face: &FaceBox) -> Option<LandmarkSet>;
}

/// Simulated face backend.
///
/// Reports a centered face whenever the frame is bright enough, and
/// synthesizes landmarks whose eye aperture drifts through a slow cycle so
/// the downstream window sees realistic open/closed variation.
pub struct SimulatedDetector {
    /// Frames darker than this have no detectable face
    pub min_luma: u8,
}

impl Default for SimulatedDetector {
    fn default() -> Self {
        Self { min_luma: 40 }
    }
}

impl FaceDetector for SimulatedDetector {
    fn detect(&mut self, frame: &Frame) -> Option<FaceBox> {
        if frame.mean_luma() < self.min_luma {
            debug!(sequence = frame.sequence, "frame too dark, no face");
            return None;
        }
        Some(FaceBox {
            x: frame.width as f32 * 0.25,
            y: frame.height as f32 * 0.25,
            width: frame.width as f32 * 0.5,
            height: frame.height as f32 * 0.5,
            confidence: 0.9,
        })
    }
}

impl LandmarkExtractor for SimulatedDetector {
    fn extract(&mut self, frame: &Frame, face: &FaceBox) -> Option<LandmarkSet> {
        // Eye aperture cycles between drowsy and alert over ~2 minutes of
        // frames; EAR for the generated geometry equals height/half-width.
        let phase = frame.sequence as f64 * 0.05;
        let ear = 0.08 + 0.22 * (0.5 + 0.5 * phase.sin());
        synthesize_landmarks(face, ear, 0.2).ok()
    }
}

/// Build a 68-point set whose eyes read as `ear` and mouth as `mar`
pub fn synthesize_landmarks(
    face: &FaceBox,
    ear: f64,
    mar: f64,
) -> Result<LandmarkSet, crate::VisionError> {
    let mut points: Vec<Point> = vec![(0.0, 0.0); LANDMARK_COUNT];

    let cx = face.x + face.width / 2.0;
    let cy = face.y + face.height / 2.0;
    let eye_dx = face.width * 0.2;

    write_eye(&mut points, 36, (cx - eye_dx, cy - 10.0), ear);
    write_eye(&mut points, 42, (cx + eye_dx, cy - 10.0), ear);
    write_mouth(&mut points, 60, (cx, cy + 30.0), mar);

    LandmarkSet::new(points)
}

fn write_eye(points: &mut [Point], base: usize, center: (f32, f32), ear: f64) {
    let w = 20.0f32;
    let h = (ear * w as f64) as f32;
    let (cx, cy) = center;
    points[base] = (cx - w, cy);
    points[base + 1] = (cx - w / 2.0, cy - h);
    points[base + 2] = (cx + w / 2.0, cy - h);
    points[base + 3] = (cx + w, cy);
    points[base + 4] = (cx + w / 2.0, cy + h);
    points[base + 5] = (cx - w / 2.0, cy + h);
}

fn write_mouth(points: &mut [Point], base: usize, center: (f32, f32), mar: f64) {
    let w = 15.0f32;
    let v = (mar * (2.0 * w) as f64 / 2.0) as f32;
    let (cx, cy) = center;
    points[base] = (cx - w, cy);
    points[base + 1] = (cx - w / 2.0, cy - v);
    points[base + 2] = (cx, cy - v);
    points[base + 3] = (cx + w / 2.0, cy - v);
    points[base + 4] = (cx + w, cy);
    points[base + 5] = (cx + w / 2.0, cy + v);
    points[base + 6] = (cx, cy + v);
    points[base + 7] = (cx - w / 2.0, cy + v);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face() -> FaceBox {
        FaceBox {
            x: 100.0,
            y: 100.0,
            width: 200.0,
            height: 200.0,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_synthesized_ear_matches_request() {
        for target in [0.05, 0.21, 0.35] {
            let lm = synthesize_landmarks(&face(), target, 0.2).unwrap();
            assert!((lm.average_ear() - target).abs() < 1e-3);
        }
    }

    #[test]
    fn test_synthesized_mar_matches_request() {
        let lm = synthesize_landmarks(&face(), 0.3, 0.7).unwrap();
        assert!((lm.mar() - 0.7).abs() < 1e-3);
    }

    #[test]
    fn test_dark_frame_has_no_face() {
        let mut det = SimulatedDetector::default();
        let dark = Frame::new(vec![0; 12], 2, 2, 0, 1);
        assert!(det.detect(&dark).is_none());

        let lit = Frame::new(vec![200; 12], 2, 2, 0, 1);
        assert!(det.detect(&lit).is_some());
    }
}
