//! Video frame type

/// Decoded RGB video frame.
///
/// Owned by the vision service for one processing cycle; never retained
/// past metric extraction.
#[derive(Debug, Clone)]
pub struct Frame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (ms since UNIX epoch)
    pub timestamp_ms: u64,
    /// Frame sequence number
    pub sequence: u64,
}

impl Frame {
    /// Create a new frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ms: u64, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ms,
            sequence,
        }
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> Vec<u8> {
        let mut gray = Vec::with_capacity((self.width * self.height) as usize);
        for pixel in self.data.chunks(3) {
            // Luminance formula: 0.299*R + 0.587*G + 0.114*B
            let y = (pixel[0] as f32 * 0.299
                + pixel[1] as f32 * 0.587
                + pixel[2] as f32 * 0.114) as u8;
            gray.push(y);
        }
        gray
    }

    /// Average luminance (0-255)
    pub fn mean_luma(&self) -> u8 {
        let gray = self.to_grayscale();
        if gray.is_empty() {
            return 0;
        }
        let sum: u64 = gray.iter().map(|&v| v as u64).sum();
        (sum / gray.len() as u64) as u8
    }
}
