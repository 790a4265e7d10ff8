//! Facial landmark geometry: EAR and MAR

use crate::VisionError;

/// A 2-D keypoint in frame coordinates
pub type Point = (f32, f32);

/// Points in the 68-point landmark layout
pub const LANDMARK_COUNT: usize = 68;

/// Right eye landmark indices
pub const RIGHT_EYE: std::ops::Range<usize> = 36..42;
/// Left eye landmark indices
pub const LEFT_EYE: std::ops::Range<usize> = 42..48;
/// Inner mouth landmark indices
pub const INNER_MOUTH: std::ops::Range<usize> = 60..68;

/// Ordered 68-point landmark set for one frame; discarded after metric
/// extraction.
#[derive(Debug, Clone)]
pub struct LandmarkSet(Vec<Point>);

impl LandmarkSet {
    pub fn new(points: Vec<Point>) -> Result<Self, VisionError> {
        if points.len() != LANDMARK_COUNT {
            return Err(VisionError::Landmarks);
        }
        Ok(Self(points))
    }

    pub fn left_eye(&self) -> &[Point] {
        &self.0[LEFT_EYE]
    }

    pub fn right_eye(&self) -> &[Point] {
        &self.0[RIGHT_EYE]
    }

    pub fn inner_mouth(&self) -> &[Point] {
        &self.0[INNER_MOUTH]
    }

    /// Mean of the per-eye aspect ratios
    pub fn average_ear(&self) -> f64 {
        (eye_aspect_ratio(self.left_eye()) + eye_aspect_ratio(self.right_eye())) / 2.0
    }

    /// Mouth aspect ratio over the inner mouth points
    pub fn mar(&self) -> f64 {
        mouth_aspect_ratio(self.inner_mouth())
    }
}

fn dist(a: Point, b: Point) -> f64 {
    let dx = (a.0 - b.0) as f64;
    let dy = (a.1 - b.1) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Eye aspect ratio from 6 eye landmarks: mean vertical span over
/// horizontal span. Low values indicate a closed eye.
pub fn eye_aspect_ratio(eye: &[Point]) -> f64 {
    debug_assert_eq!(eye.len(), 6);
    let a = dist(eye[1], eye[5]);
    let b = dist(eye[2], eye[4]);
    let c = dist(eye[0], eye[3]);
    if c > 0.0 {
        (a + b) / (2.0 * c)
    } else {
        0.0
    }
}

/// Mouth aspect ratio from 8 inner-mouth landmarks. High values indicate
/// an open mouth (yawn proxy).
pub fn mouth_aspect_ratio(mouth: &[Point]) -> f64 {
    debug_assert_eq!(mouth.len(), 8);
    let a = dist(mouth[1], mouth[7]);
    let b = dist(mouth[2], mouth[6]);
    let c = dist(mouth[3], mouth[5]);
    let d = dist(mouth[0], mouth[4]);
    if d > 0.0 {
        (a + b + c) / (3.0 * d)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Six eye points with a given half-height `h` over half-width 2.0
    fn eye(h: f32) -> Vec<Point> {
        vec![
            (-2.0, 0.0),
            (-1.0, h),
            (1.0, h),
            (2.0, 0.0),
            (1.0, -h),
            (-1.0, -h),
        ]
    }

    #[test]
    fn test_open_eye_has_high_ear() {
        // EAR = (2h + 2h) / (2 * 4) = h / 2
        let open = eye_aspect_ratio(&eye(0.6));
        let closed = eye_aspect_ratio(&eye(0.05));
        assert!((open - 0.3).abs() < 1e-6);
        assert!((closed - 0.025).abs() < 1e-6);
        assert!(open > closed);
    }

    #[test]
    fn test_degenerate_eye_is_zero() {
        let points = vec![(0.0, 0.0); 6];
        assert_eq!(eye_aspect_ratio(&points), 0.0);
    }

    #[test]
    fn test_mouth_aspect_ratio() {
        // Horizontal span 4, three vertical spans of 2 each -> MAR = 0.5
        let mouth = vec![
            (-2.0, 0.0),
            (-1.0, 1.0),
            (0.0, 1.0),
            (1.0, 1.0),
            (2.0, 0.0),
            (1.0, -1.0),
            (0.0, -1.0),
            (-1.0, -1.0),
        ];
        let mar = mouth_aspect_ratio(&mouth);
        assert!((mar - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_landmark_set_requires_68_points() {
        assert!(LandmarkSet::new(vec![(0.0, 0.0); 67]).is_err());
        assert!(LandmarkSet::new(vec![(0.0, 0.0); 68]).is_ok());
    }
}
