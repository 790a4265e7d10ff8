//! LED pattern animation over an abstract RGB backend

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::HardwareError;

/// LED display patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedPattern {
    Solid,
    Blink,
    Breathe,
    Off,
}

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const GREEN: Rgb = Rgb { r: 0, g: 255, b: 0 };
    pub const YELLOW: Rgb = Rgb { r: 255, g: 255, b: 0 };
    pub const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
}

/// Abstract RGB output. The GPIO/PWM wrapper implements this.
pub trait LedBackend: Send + 'static {
    /// Apply a color at a brightness percentage (0-100)
    fn apply(&mut self, color: Rgb, brightness: u8) -> Result<(), HardwareError>;
}

/// Simulation backend used when no GPIO is present
pub struct LoggingLedBackend;

impl LedBackend for LoggingLedBackend {
    fn apply(&mut self, color: Rgb, brightness: u8) -> Result<(), HardwareError> {
        debug!(r = color.r, g = color.g, b = color.b, brightness, "led");
        Ok(())
    }
}

/// LED animation timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedConfig {
    /// On/off phase length for the blink pattern (ms)
    pub blink_interval_ms: u64,
    /// Full fade-in + fade-out cycle for the breathe pattern (ms)
    pub breathe_period_ms: u64,
    /// Brightness steps per fade direction
    pub breathe_steps: u32,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            blink_interval_ms: 300,
            breathe_period_ms: 2000,
            breathe_steps: 50,
        }
    }
}

/// A pattern + color request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedCommand {
    pub pattern: LedPattern,
    pub color: Rgb,
}

/// Non-blocking handle to the LED controller task. Latest command wins.
#[derive(Clone)]
pub struct LedHandle {
    tx: mpsc::UnboundedSender<LedCommand>,
}

impl LedHandle {
    pub fn set(&self, pattern: LedPattern, color: Rgb) {
        let _ = self.tx.send(LedCommand { pattern, color });
    }

    /// A detached handle + receiver pair, for driving a fake controller in tests
    pub fn channel() -> (LedHandle, mpsc::UnboundedReceiver<LedCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (LedHandle { tx }, rx)
    }
}

/// Spawn the controller task animating patterns on `backend`
pub fn spawn_led_controller(
    mut backend: Box<dyn LedBackend>,
    cfg: LedConfig,
) -> (LedHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<LedCommand>();
    let handle = LedHandle { tx };

    fn apply(backend: &mut dyn LedBackend, color: Rgb, brightness: u8) {
        if let Err(e) = backend.apply(color, brightness) {
            warn!(error = %e, "led backend write failed");
        }
    }

    let task = tokio::spawn(async move {
        let mut current = LedCommand {
            pattern: LedPattern::Off,
            color: Rgb::BLACK,
        };
        let mut blink_on = true;
        let mut breathe_step: u32 = 0;
        let mut breathe_rising = true;

        loop {
            let step_ms = match current.pattern {
                LedPattern::Blink => cfg.blink_interval_ms,
                LedPattern::Breathe => {
                    (cfg.breathe_period_ms / (2 * cfg.breathe_steps.max(1)) as u64).max(5)
                }
                _ => 0,
            };
            let animating = step_ms > 0;

            tokio::select! {
                cmd = rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    if cmd == current {
                        continue;
                    }
                    current = cmd;
                    blink_on = true;
                    breathe_step = 0;
                    breathe_rising = true;
                    match current.pattern {
                        LedPattern::Solid | LedPattern::Blink => {
                            apply(&mut *backend, current.color, 100);
                        }
                        LedPattern::Breathe => apply(&mut *backend, current.color, 0),
                        LedPattern::Off => apply(&mut *backend, Rgb::BLACK, 0),
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(step_ms)), if animating => {
                    match current.pattern {
                        LedPattern::Blink => {
                            blink_on = !blink_on;
                            if blink_on {
                                apply(&mut *backend, current.color, 100);
                            } else {
                                apply(&mut *backend, Rgb::BLACK, 0);
                            }
                        }
                        LedPattern::Breathe => {
                            if breathe_rising {
                                breathe_step += 1;
                                if breathe_step >= cfg.breathe_steps {
                                    breathe_rising = false;
                                }
                            } else if breathe_step > 0 {
                                breathe_step -= 1;
                            } else {
                                breathe_rising = true;
                            }
                            let brightness =
                                (breathe_step * 100 / cfg.breathe_steps.max(1)) as u8;
                            apply(&mut *backend, current.color, brightness);
                        }
                        _ => {}
                    }
                }
            }
        }
    });

    (handle, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingBackend(Arc<Mutex<Vec<(Rgb, u8)>>>);

    impl LedBackend for RecordingBackend {
        fn apply(&mut self, color: Rgb, brightness: u8) -> Result<(), HardwareError> {
            self.0.lock().unwrap().push((color, brightness));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_solid_applied_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (handle, _task) =
            spawn_led_controller(Box::new(RecordingBackend(log.clone())), LedConfig::default());

        handle.set(LedPattern::Solid, Rgb::GREEN);
        tokio::time::sleep(Duration::from_secs(2)).await;

        let applied = log.lock().unwrap().clone();
        assert_eq!(applied, vec![(Rgb::GREEN, 100)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blink_toggles() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let cfg = LedConfig {
            blink_interval_ms: 100,
            ..Default::default()
        };
        let (handle, _task) = spawn_led_controller(Box::new(RecordingBackend(log.clone())), cfg);

        handle.set(LedPattern::Blink, Rgb::YELLOW);
        tokio::time::sleep(Duration::from_millis(350)).await;

        let applied = log.lock().unwrap().clone();
        assert!(applied.len() >= 3);
        assert_eq!(applied[0], (Rgb::YELLOW, 100));
        assert_eq!(applied[1], (Rgb::BLACK, 0));
        assert_eq!(applied[2], (Rgb::YELLOW, 100));
    }
}
