//! Vision service worker

use std::time::Duration;

use tracing::{debug, info};

use message_bus::{
    now_ms, Bus, ControlSignal, Event, FatigueEvent, FatigueLevel, Heartbeat, ServiceId, Topic,
};

use crate::camera::{FrameSource, SyntheticCamera};
use crate::detect::{FaceDetector, LandmarkExtractor, SimulatedDetector};
use crate::fatigue::{FatigueSample, FatigueWindow, LevelMapper};
use crate::frame::Frame;
use crate::{VisionConfig, VisionError};

/// Continuous acquisition-and-analysis worker.
///
/// Owns the camera exclusively for its lifetime, publishes FatigueEvents on
/// level change or at the status interval, and heartbeats to the
/// supervisor. Pause suspends frame analysis; heartbeats continue so the
/// supervisor does not mistake a paused service for a dead one.
pub struct VisionService {
    cfg: VisionConfig,
    bus: Bus,
    source: Box<dyn FrameSource>,
    detector: Box<dyn FaceDetector>,
    landmarks: Box<dyn LandmarkExtractor>,
    window: FatigueWindow,
    mapper: LevelMapper,
    paused: bool,
    frame_count: u64,
    miss_count: u64,
    last_published: Option<(FatigueLevel, u64)>,
    last_face_missing_ms: u64,
}

impl VisionService {
    pub fn new(
        cfg: VisionConfig,
        bus: Bus,
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        landmarks: Box<dyn LandmarkExtractor>,
    ) -> Self {
        let window = FatigueWindow::new(cfg.perclos_window_secs, cfg.mar_threshold);
        let mapper = LevelMapper::new(cfg.thresholds.clone());
        Self {
            cfg,
            bus,
            source,
            detector,
            landmarks,
            window,
            mapper,
            paused: false,
            frame_count: 0,
            miss_count: 0,
            last_published: None,
            last_face_missing_ms: 0,
        }
    }

    /// A service wired to the built-in synthetic camera and detector
    pub fn simulated(cfg: VisionConfig, bus: Bus) -> Self {
        let camera = SyntheticCamera::new(cfg.width, cfg.height);
        Self::new(
            cfg,
            bus,
            Box::new(camera),
            Box::new(SimulatedDetector::default()),
            Box::new(SimulatedDetector::default()),
        )
    }

    /// Run until shutdown. Camera open failure is fatal; the supervisor
    /// restarts the service with backoff.
    pub async fn run(mut self) -> Result<(), VisionError> {
        self.source.open()?;
        info!(fps = self.cfg.fps, frame_skip = self.cfg.frame_skip, "vision service started");

        let mut ctrl = self.bus.subscribe(&[Topic::Control]);
        let mut frame_tick =
            tokio::time::interval(Duration::from_secs_f64(1.0 / self.cfg.fps.max(1) as f64));
        frame_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut heartbeat =
            tokio::time::interval(Duration::from_millis(self.cfg.heartbeat_interval_ms.max(100)));
        // Monotonic clock for publish rate limiting; wall time only goes
        // into published event timestamps.
        let started = tokio::time::Instant::now();

        loop {
            tokio::select! {
                ev = ctrl.recv() => {
                    match ev {
                        Some(Event::Control(ControlSignal::Pause)) => {
                            info!("vision processing paused");
                            self.paused = true;
                        }
                        Some(Event::Control(ControlSignal::Resume)) => {
                            info!("vision processing resumed");
                            self.paused = false;
                        }
                        Some(Event::Control(ControlSignal::Shutdown)) | None => {
                            self.bus.publish(Event::Control(ControlSignal::ShutdownAck(
                                ServiceId::Vision,
                            )));
                            break;
                        }
                        _ => {}
                    }
                }
                _ = heartbeat.tick() => {
                    self.bus.publish(Event::Heartbeat(Heartbeat {
                        service: ServiceId::Vision,
                        timestamp_ms: now_ms(),
                    }));
                }
                _ = frame_tick.tick() => {
                    if !self.paused {
                        self.process_cycle(started.elapsed().as_millis() as u64);
                    }
                }
            }
        }

        self.source.close();
        info!(misses = self.miss_count, "vision service stopped");
        Ok(())
    }

    fn process_cycle(&mut self, mono_ms: u64) {
        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                // Transient: a single failed capture never kills the loop
                self.miss_count += 1;
                debug!(error = %e, "frame capture failed");
                return;
            }
        };

        self.frame_count += 1;
        if self.cfg.frame_skip > 1 && self.frame_count % self.cfg.frame_skip as u64 != 0 {
            return;
        }

        let Some(face) = self.detector.detect(&frame) else {
            self.on_face_missing(&frame, mono_ms);
            return;
        };

        let Some(landmarks) = self.landmarks.extract(&frame, &face) else {
            self.miss_count += 1;
            debug!(sequence = frame.sequence, "landmark extraction failed");
            return;
        };

        let sample = FatigueSample {
            timestamp_ms: frame.timestamp_ms,
            ear: landmarks.average_ear(),
            mar: landmarks.mar(),
        };
        self.window.push(sample);

        let perclos = self.window.perclos(self.cfg.ear_threshold);
        let yawns = self.window.yawns_per_minute();
        let level = self.mapper.update(perclos, yawns);

        let status_interval_ms = self.cfg.status_interval_secs * 1000;
        let publish = match self.last_published {
            None => true,
            Some((last_level, last_ms)) => {
                level != last_level || mono_ms.saturating_sub(last_ms) >= status_interval_ms
            }
        };

        if publish {
            debug!(level = level.as_str(), perclos, yawns, "fatigue status");
            self.bus.publish(Event::Fatigue(FatigueEvent {
                level,
                score: perclos,
                face_detected: true,
                timestamp_ms: now_ms(),
            }));
            self.last_published = Some((level, mono_ms));
        }
    }

    /// Not an error: an empty chair is a normal operating mode. Status
    /// still goes out, at a reduced rate, with the last mapped level.
    fn on_face_missing(&mut self, frame: &Frame, mono_ms: u64) {
        let interval_ms = self.cfg.face_missing_interval_secs * 1000;
        if self.last_face_missing_ms > 0
            && mono_ms.saturating_sub(self.last_face_missing_ms) < interval_ms
        {
            return;
        }
        self.last_face_missing_ms = mono_ms;
        debug!(sequence = frame.sequence, "no face in frame");
        self.bus.publish(Event::Fatigue(FatigueEvent {
            level: self.mapper.level(),
            score: self.window.perclos(self.cfg.ear_threshold),
            face_detected: false,
            timestamp_ms: now_ms(),
        }));
    }
}
