//! Fatigue window and level mapping

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use message_bus::FatigueLevel;

/// Instantaneous aperture metrics for one processed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FatigueSample {
    pub timestamp_ms: u64,
    pub ear: f64,
    pub mar: f64,
}

/// Trailing time window of fatigue samples.
///
/// Invariant: only samples within `window_ms` of the newest sample are
/// retained, bounding memory independent of uptime. Yawns are counted on
/// the rising edge of MAR crossing its threshold and kept for a trailing
/// minute.
pub struct FatigueWindow {
    samples: VecDeque<FatigueSample>,
    yawns: VecDeque<u64>,
    window_ms: u64,
    mar_threshold: f64,
    in_yawn: bool,
}

const YAWN_WINDOW_MS: u64 = 60_000;

impl FatigueWindow {
    pub fn new(window_secs: u64, mar_threshold: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            yawns: VecDeque::new(),
            window_ms: window_secs * 1000,
            mar_threshold,
            in_yawn: false,
        }
    }

    /// Append a sample, evicting everything older than the trailing window
    pub fn push(&mut self, sample: FatigueSample) {
        if sample.mar > self.mar_threshold {
            if !self.in_yawn {
                self.in_yawn = true;
                self.yawns.push_back(sample.timestamp_ms);
            }
        } else {
            self.in_yawn = false;
        }

        self.samples.push_back(sample);
        self.evict(sample.timestamp_ms);
    }

    fn evict(&mut self, now_ms: u64) {
        let cutoff = now_ms.saturating_sub(self.window_ms);
        while self
            .samples
            .front()
            .is_some_and(|s| s.timestamp_ms < cutoff)
        {
            self.samples.pop_front();
        }

        let yawn_cutoff = now_ms.saturating_sub(YAWN_WINDOW_MS);
        while self.yawns.front().is_some_and(|&t| t < yawn_cutoff) {
            self.yawns.pop_front();
        }
    }

    /// Fraction of windowed samples with EAR below threshold (0.0 - 1.0)
    pub fn perclos(&self, ear_threshold: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let closed = self
            .samples
            .iter()
            .filter(|s| s.ear < ear_threshold)
            .count();
        closed as f64 / self.samples.len() as f64
    }

    /// Yawns observed over the trailing minute
    pub fn yawns_per_minute(&self) -> u32 {
        self.yawns.len() as u32
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Level escalation/de-escalation thresholds.
///
/// De-escalation thresholds sit strictly below their escalation
/// counterparts so a trace hovering at a boundary cannot flap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FatigueThresholds {
    pub perclos_mild_enter: f64,
    pub perclos_mild_exit: f64,
    pub perclos_severe_enter: f64,
    pub perclos_severe_exit: f64,
    pub yawn_mild_per_min: u32,
    pub yawn_severe_per_min: u32,
}

impl Default for FatigueThresholds {
    fn default() -> Self {
        Self {
            perclos_mild_enter: 0.25,
            perclos_mild_exit: 0.15,
            perclos_severe_enter: 0.40,
            perclos_severe_exit: 0.30,
            yawn_mild_per_min: 3,
            yawn_severe_per_min: 5,
        }
    }
}

/// Maps PERCLOS and yawn rate to a discrete level with hysteresis
pub struct LevelMapper {
    thresholds: FatigueThresholds,
    level: FatigueLevel,
}

impl LevelMapper {
    pub fn new(thresholds: FatigueThresholds) -> Self {
        Self {
            thresholds,
            level: FatigueLevel::Normal,
        }
    }

    pub fn level(&self) -> FatigueLevel {
        self.level
    }

    /// Update the level from the current window metrics.
    ///
    /// Escalation uses the enter thresholds immediately; de-escalation
    /// requires dropping below the stricter exit thresholds.
    pub fn update(&mut self, perclos: f64, yawns_per_min: u32) -> FatigueLevel {
        let t = &self.thresholds;

        let target = if perclos >= t.perclos_severe_enter || yawns_per_min >= t.yawn_severe_per_min
        {
            FatigueLevel::Severe
        } else if perclos >= t.perclos_mild_enter || yawns_per_min >= t.yawn_mild_per_min {
            FatigueLevel::Mild
        } else {
            FatigueLevel::Normal
        };

        self.level = match self.level {
            FatigueLevel::Normal => target,
            FatigueLevel::Mild => {
                if target == FatigueLevel::Severe {
                    FatigueLevel::Severe
                } else if perclos < t.perclos_mild_exit && yawns_per_min < t.yawn_mild_per_min {
                    FatigueLevel::Normal
                } else {
                    FatigueLevel::Mild
                }
            }
            FatigueLevel::Severe => {
                if perclos < t.perclos_severe_exit && yawns_per_min < t.yawn_severe_per_min {
                    if perclos < t.perclos_mild_exit && yawns_per_min < t.yawn_mild_per_min {
                        FatigueLevel::Normal
                    } else {
                        FatigueLevel::Mild
                    }
                } else {
                    FatigueLevel::Severe
                }
            }
        };

        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(ts: u64, ear: f64) -> FatigueSample {
        FatigueSample {
            timestamp_ms: ts,
            ear,
            mar: 0.0,
        }
    }

    #[test]
    fn test_window_eviction() {
        let mut w = FatigueWindow::new(10, 0.6);
        w.push(sample(1_000, 0.3));
        w.push(sample(5_000, 0.3));
        w.push(sample(12_000, 0.3));
        assert_eq!(w.len(), 2); // the 1s sample fell out of the 10s window

        w.push(sample(30_000, 0.3));
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_perclos_counts_closed_samples() {
        let mut w = FatigueWindow::new(60, 0.6);
        w.push(sample(1_000, 0.1)); // closed
        w.push(sample(2_000, 0.3)); // open
        w.push(sample(3_000, 0.1)); // closed
        w.push(sample(4_000, 0.3)); // open
        assert!((w.perclos(0.21) - 0.5).abs() < 1e-9);
        assert_eq!(w.perclos(0.05), 0.0);
    }

    #[test]
    fn test_empty_window_perclos_zero() {
        let w = FatigueWindow::new(60, 0.6);
        assert_eq!(w.perclos(0.21), 0.0);
    }

    #[test]
    fn test_yawn_rising_edge_counted_once() {
        let mut w = FatigueWindow::new(60, 0.6);
        // One yawn spanning three frames
        w.push(FatigueSample { timestamp_ms: 1_000, ear: 0.3, mar: 0.8 });
        w.push(FatigueSample { timestamp_ms: 1_100, ear: 0.3, mar: 0.9 });
        w.push(FatigueSample { timestamp_ms: 1_200, ear: 0.3, mar: 0.7 });
        w.push(FatigueSample { timestamp_ms: 1_300, ear: 0.3, mar: 0.1 });
        assert_eq!(w.yawns_per_minute(), 1);

        // A second distinct yawn
        w.push(FatigueSample { timestamp_ms: 2_000, ear: 0.3, mar: 0.8 });
        assert_eq!(w.yawns_per_minute(), 2);
    }

    #[test]
    fn test_yawns_expire_after_a_minute() {
        let mut w = FatigueWindow::new(120, 0.6);
        w.push(FatigueSample { timestamp_ms: 1_000, ear: 0.3, mar: 0.8 });
        w.push(FatigueSample { timestamp_ms: 2_000, ear: 0.3, mar: 0.1 });
        assert_eq!(w.yawns_per_minute(), 1);
        w.push(FatigueSample { timestamp_ms: 70_000, ear: 0.3, mar: 0.1 });
        assert_eq!(w.yawns_per_minute(), 0);
    }

    #[test]
    fn test_escalation_ladder() {
        let mut m = LevelMapper::new(FatigueThresholds::default());
        assert_eq!(m.update(0.10, 0), FatigueLevel::Normal);
        assert_eq!(m.update(0.25, 0), FatigueLevel::Mild);
        assert_eq!(m.update(0.40, 0), FatigueLevel::Severe);
    }

    #[test]
    fn test_yawn_rate_escalates() {
        let mut m = LevelMapper::new(FatigueThresholds::default());
        assert_eq!(m.update(0.0, 3), FatigueLevel::Mild);
        assert_eq!(m.update(0.0, 5), FatigueLevel::Severe);
    }

    #[test]
    fn test_no_flapping_at_escalation_threshold() {
        let mut m = LevelMapper::new(FatigueThresholds::default());
        // Oscillate exactly around the mild escalation threshold
        let mut transitions = 0;
        let mut last = m.level();
        for i in 0..100 {
            let perclos = if i % 2 == 0 { 0.25 } else { 0.24 };
            let level = m.update(perclos, 0);
            if level != last {
                transitions += 1;
                last = level;
            }
        }
        // One escalation to Mild, then it must hold
        assert_eq!(transitions, 1);
        assert_eq!(m.level(), FatigueLevel::Mild);
    }

    #[test]
    fn test_deescalation_requires_exit_threshold() {
        let mut m = LevelMapper::new(FatigueThresholds::default());
        m.update(0.45, 0);
        assert_eq!(m.level(), FatigueLevel::Severe);

        // Below severe-enter but above severe-exit: stays Severe
        assert_eq!(m.update(0.35, 0), FatigueLevel::Severe);
        // Below severe-exit but above mild-exit: drops one band
        assert_eq!(m.update(0.20, 0), FatigueLevel::Mild);
        // Below mild-exit: back to Normal
        assert_eq!(m.update(0.10, 0), FatigueLevel::Normal);
    }

    #[test]
    fn test_severe_drops_straight_to_normal_when_clear() {
        let mut m = LevelMapper::new(FatigueThresholds::default());
        m.update(0.45, 0);
        assert_eq!(m.update(0.05, 0), FatigueLevel::Normal);
    }

    proptest! {
        #[test]
        fn prop_perclos_in_unit_interval(ears in proptest::collection::vec(0.0f64..0.6, 1..200)) {
            let mut w = FatigueWindow::new(3600, 0.6);
            for (i, ear) in ears.iter().enumerate() {
                w.push(sample(i as u64 * 50, *ear));
            }
            let p = w.perclos(0.21);
            prop_assert!((0.0..=1.0).contains(&p));

            let closed = ears.iter().filter(|&&e| e < 0.21).count();
            let expected = closed as f64 / ears.len() as f64;
            prop_assert!((p - expected).abs() < 1e-9);
        }
    }
}
