//! Camera source contract and the built-in synthetic source

use tracing::info;

use crate::frame::Frame;
use crate::VisionError;
use message_bus::now_ms;

/// Exclusive camera ownership for the lifetime of the vision service.
///
/// The real V4L2 device wrapper is an external collaborator; implementations
/// must keep `next_frame` time-bounded so a stop request is observed within
/// one processing cycle.
pub trait FrameSource: Send {
    /// Acquire the device. Failure here is fatal to the service.
    fn open(&mut self) -> Result<(), VisionError>;

    /// Capture the next frame
    fn next_frame(&mut self) -> Result<Frame, VisionError>;

    /// Release the device
    fn close(&mut self) {}
}

/// Deterministic test-pattern source used when no camera hardware is
/// attached, mirroring the mock mode the rest of the pipeline boots with.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    sequence: u64,
    opened: bool,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sequence: 0,
            opened: false,
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn open(&mut self) -> Result<(), VisionError> {
        self.opened = true;
        info!(width = self.width, height = self.height, "synthetic camera opened");
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, VisionError> {
        if !self.opened {
            return Err(VisionError::Capture("camera not opened".into()));
        }
        self.sequence += 1;
        // Flat mid-gray with a slow drift so consecutive frames differ
        let luma = 128u8.wrapping_add((self.sequence % 32) as u8);
        let data = vec![luma; (self.width * self.height * 3) as usize];
        Ok(Frame::new(
            data,
            self.width,
            self.height,
            now_ms(),
            self.sequence,
        ))
    }

    fn close(&mut self) {
        self.opened = false;
        info!("synthetic camera closed");
    }
}
