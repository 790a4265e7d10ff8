//! Button gesture classification
//!
//! Raw press/release edges arrive pre-debounced from the external GPIO
//! adapter. Classification thresholds: release after >= 10s is a very long
//! press, >= 3s a long press; shorter presses resolve to double or single
//! depending on the inter-press gap.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use message_bus::{now_ms, Bus, ButtonGesture, Event, GestureKind};

/// A debounced button edge with its timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Pressed,
    Released,
}

/// Gesture classification thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonConfig {
    /// Press duration for a long press (ms)
    pub long_press_ms: u64,
    /// Press duration for a very long press (ms)
    pub very_long_press_ms: u64,
    /// Maximum gap between two short releases to count as a double press (ms)
    pub double_gap_ms: u64,
    /// How often the worker flushes a deferred single press (ms)
    pub poll_interval_ms: u64,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            long_press_ms: 3000,
            very_long_press_ms: 10_000,
            double_gap_ms: 500,
            poll_interval_ms: 50,
        }
    }
}

/// Pure, timestamp-driven gesture classifier.
///
/// A short release is held back for `double_gap_ms` before it becomes a
/// single press, so a quick second press can upgrade it to a double.
pub struct GestureDetector {
    cfg: ButtonConfig,
    pressed_at: Option<u64>,
    last_short_release: Option<u64>,
    pending_single_deadline: Option<u64>,
}

impl GestureDetector {
    pub fn new(cfg: ButtonConfig) -> Self {
        Self {
            cfg,
            pressed_at: None,
            last_short_release: None,
            pending_single_deadline: None,
        }
    }

    /// Feed one edge; returns a gesture when one is resolved immediately
    pub fn on_edge(&mut self, edge: ButtonEdge, at_ms: u64) -> Option<GestureKind> {
        match edge {
            ButtonEdge::Pressed => {
                self.pressed_at = Some(at_ms);
                None
            }
            ButtonEdge::Released => {
                let start = self.pressed_at.take()?;
                let duration = at_ms.saturating_sub(start);

                if duration >= self.cfg.very_long_press_ms {
                    return Some(GestureKind::VeryLong);
                }
                if duration >= self.cfg.long_press_ms {
                    return Some(GestureKind::Long);
                }

                if let Some(prev) = self.last_short_release.take() {
                    if at_ms.saturating_sub(prev) <= self.cfg.double_gap_ms {
                        self.pending_single_deadline = None;
                        return Some(GestureKind::Double);
                    }
                }
                self.last_short_release = Some(at_ms);
                self.pending_single_deadline = Some(at_ms + self.cfg.double_gap_ms);
                None
            }
        }
    }

    /// Flush a deferred single press once the double-click window has passed
    pub fn poll(&mut self, now_ms: u64) -> Option<GestureKind> {
        let deadline = self.pending_single_deadline?;
        if now_ms >= deadline {
            self.pending_single_deadline = None;
            self.last_short_release = None;
            return Some(GestureKind::Single);
        }
        None
    }
}

/// Spawn the worker that turns raw edges into published gestures
pub fn spawn_button_worker(
    bus: Bus,
    mut edges: mpsc::Receiver<ButtonEdge>,
    cfg: ButtonConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut detector = GestureDetector::new(cfg.clone());
        let mut poll = tokio::time::interval(Duration::from_millis(cfg.poll_interval_ms.max(10)));
        info!("button worker started");

        loop {
            let gesture = tokio::select! {
                edge = edges.recv() => match edge {
                    Some(edge) => detector.on_edge(edge, now_ms()),
                    None => break,
                },
                _ = poll.tick() => detector.poll(now_ms()),
            };

            if let Some(kind) = gesture {
                debug!(?kind, "button gesture");
                bus.publish(Event::Button(ButtonGesture {
                    kind,
                    timestamp_ms: now_ms(),
                }));
            }
        }
        info!("button worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> GestureDetector {
        GestureDetector::new(ButtonConfig::default())
    }

    #[test]
    fn test_single_press_after_window() {
        let mut d = detector();
        assert_eq!(d.on_edge(ButtonEdge::Pressed, 1000), None);
        assert_eq!(d.on_edge(ButtonEdge::Released, 1200), None);
        // Still inside the double-click window
        assert_eq!(d.poll(1400), None);
        assert_eq!(d.poll(1701), Some(GestureKind::Single));
        assert_eq!(d.poll(1800), None);
    }

    #[test]
    fn test_double_press() {
        let mut d = detector();
        d.on_edge(ButtonEdge::Pressed, 1000);
        assert_eq!(d.on_edge(ButtonEdge::Released, 1150), None);
        d.on_edge(ButtonEdge::Pressed, 1300);
        assert_eq!(d.on_edge(ButtonEdge::Released, 1450), Some(GestureKind::Double));
        // The deferred single was consumed by the double
        assert_eq!(d.poll(2500), None);
    }

    #[test]
    fn test_long_press() {
        let mut d = detector();
        d.on_edge(ButtonEdge::Pressed, 1000);
        assert_eq!(d.on_edge(ButtonEdge::Released, 4500), Some(GestureKind::Long));
    }

    #[test]
    fn test_very_long_press() {
        let mut d = detector();
        d.on_edge(ButtonEdge::Pressed, 1000);
        assert_eq!(
            d.on_edge(ButtonEdge::Released, 12_000),
            Some(GestureKind::VeryLong)
        );
    }

    #[test]
    fn test_two_slow_presses_are_two_singles() {
        let mut d = detector();
        d.on_edge(ButtonEdge::Pressed, 1000);
        d.on_edge(ButtonEdge::Released, 1100);
        assert_eq!(d.poll(1601), Some(GestureKind::Single));

        d.on_edge(ButtonEdge::Pressed, 3000);
        d.on_edge(ButtonEdge::Released, 3100);
        assert_eq!(d.poll(3601), Some(GestureKind::Single));
    }

    #[test]
    fn test_release_without_press_ignored() {
        let mut d = detector();
        assert_eq!(d.on_edge(ButtonEdge::Released, 1000), None);
    }
}
