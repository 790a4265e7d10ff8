//! Service Supervisor
//!
//! Watches heartbeats from the long-running services. A service silent for
//! a multiple of its heartbeat interval is aborted and re-spawned with
//! exponential backoff; once the consecutive-restart budget is exhausted
//! the service is declared failed and left down, with the rest of the
//! system running in degraded mode.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use message_bus::{Bus, ControlSignal, Event, ServiceId, Topic};

/// Supervisor error types
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("all supervised services failed")]
    AllServicesFailed,
}

/// Watchdog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Expected heartbeat interval (ms)
    pub heartbeat_interval_ms: u64,
    /// Silence longer than this multiple of the interval triggers a restart
    pub silence_multiplier: u32,
    /// Consecutive failed restarts before a service is declared failed
    pub max_retries: u32,
    /// Restart backoff base (ms); doubles per consecutive retry
    pub backoff_base_ms: u64,
    /// Restart backoff cap (ms)
    pub backoff_max_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 1000,
            silence_multiplier: 3,
            max_retries: 5,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
        }
    }
}

/// Factory producing a fresh task for a (re)started service
pub type SpawnFn = Box<dyn FnMut() -> JoinHandle<()> + Send>;

enum ServiceState {
    Running,
    PendingRestart { at: Instant },
    Fatal,
}

struct Entry {
    id: ServiceId,
    spawn: SpawnFn,
    handle: Option<JoinHandle<()>>,
    last_seen: Instant,
    retries: u32,
    state: ServiceState,
}

/// Heartbeat watchdog over the registered services
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    services: Vec<Entry>,
}

impl Supervisor {
    pub fn new(cfg: SupervisorConfig, bus: Bus) -> Self {
        Self {
            cfg,
            bus,
            services: Vec::new(),
        }
    }

    /// Register a service; it is first spawned when `run` starts
    pub fn register(&mut self, id: ServiceId, spawn: SpawnFn) {
        self.services.push(Entry {
            id,
            spawn,
            handle: None,
            last_seen: Instant::now(),
            retries: 0,
            state: ServiceState::Running,
        });
    }

    /// Run until shutdown, or until every service has failed
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let mut sub = self.bus.subscribe(&[Topic::Heartbeats, Topic::Control]);

        for entry in &mut self.services {
            entry.handle = Some((entry.spawn)());
            entry.last_seen = Instant::now();
            info!(service = entry.id.as_str(), "service started");
        }

        let mut check =
            tokio::time::interval(Duration::from_millis(self.cfg.heartbeat_interval_ms.max(100)));

        loop {
            tokio::select! {
                ev = sub.recv() => {
                    match ev {
                        Some(Event::Heartbeat(hb)) => self.on_heartbeat(hb.service),
                        Some(Event::Control(ControlSignal::Shutdown)) | None => {
                            info!("supervisor stopping");
                            return Ok(());
                        }
                        _ => {}
                    }
                }
                _ = check.tick() => {
                    if self.check_services() {
                        error!("all supervised services failed");
                        return Err(SupervisorError::AllServicesFailed);
                    }
                }
            }
        }
    }

    fn on_heartbeat(&mut self, id: ServiceId) {
        for entry in &mut self.services {
            if entry.id == id && !matches!(entry.state, ServiceState::Fatal) {
                entry.last_seen = Instant::now();
                // A live heartbeat resets the consecutive-restart budget
                entry.retries = 0;
            }
        }
    }

    /// Returns true once every service is fatal
    fn check_services(&mut self) -> bool {
        let now = Instant::now();
        let silence =
            Duration::from_millis(self.cfg.heartbeat_interval_ms * self.cfg.silence_multiplier as u64);

        for entry in &mut self.services {
            match entry.state {
                ServiceState::Running => {
                    if now.duration_since(entry.last_seen) <= silence {
                        continue;
                    }
                    warn!(
                        service = entry.id.as_str(),
                        retries = entry.retries,
                        "service heartbeat silent"
                    );
                    if let Some(handle) = entry.handle.take() {
                        handle.abort();
                    }
                    if entry.retries >= self.cfg.max_retries {
                        error!(service = entry.id.as_str(), "restart budget exhausted");
                        entry.state = ServiceState::Fatal;
                        self.bus
                            .publish(Event::Control(ControlSignal::ServiceFailed(entry.id)));
                    } else {
                        let backoff = self
                            .cfg
                            .backoff_base_ms
                            .saturating_mul(1u64 << entry.retries.min(16))
                            .min(self.cfg.backoff_max_ms);
                        entry.retries += 1;
                        entry.state = ServiceState::PendingRestart {
                            at: now + Duration::from_millis(backoff),
                        };
                        info!(
                            service = entry.id.as_str(),
                            backoff_ms = backoff,
                            "restart scheduled"
                        );
                    }
                }
                ServiceState::PendingRestart { at } => {
                    if now >= at {
                        info!(service = entry.id.as_str(), "restarting service");
                        entry.handle = Some((entry.spawn)());
                        entry.last_seen = now;
                        entry.state = ServiceState::Running;
                    }
                }
                ServiceState::Fatal => {}
            }
        }

        !self.services.is_empty()
            && self
                .services
                .iter()
                .all(|e| matches!(e.state, ServiceState::Fatal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use message_bus::{now_ms, Heartbeat};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn test_config() -> SupervisorConfig {
        SupervisorConfig {
            heartbeat_interval_ms: 1000,
            silence_multiplier: 3,
            max_retries: 2,
            backoff_base_ms: 500,
            backoff_max_ms: 5000,
        }
    }

    /// A service that never heartbeats
    fn dead_service(spawns: Arc<AtomicU32>) -> SpawnFn {
        Box::new(move || {
            spawns.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(std::future::pending())
        })
    }

    /// A service heartbeating at the expected interval
    fn live_service(spawns: Arc<AtomicU32>, bus: Bus, id: ServiceId) -> SpawnFn {
        Box::new(move || {
            spawns.fetch_add(1, Ordering::SeqCst);
            let bus = bus.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(Duration::from_millis(1000));
                loop {
                    tick.tick().await;
                    bus.publish(Event::Heartbeat(Heartbeat {
                        service: id,
                        timestamp_ms: now_ms(),
                    }));
                }
            })
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_service_is_not_restarted() {
        let bus = Bus::new(64);
        let spawns = Arc::new(AtomicU32::new(0));

        let mut sup = Supervisor::new(test_config(), bus.clone());
        sup.register(
            ServiceId::Vision,
            live_service(spawns.clone(), bus.clone(), ServiceId::Vision),
        );
        let handle = tokio::spawn(sup.run());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(spawns.load(Ordering::SeqCst), 1);

        bus.publish(Event::Control(ControlSignal::Shutdown));
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_service_is_restarted_with_backoff() {
        let bus = Bus::new(64);
        let spawns = Arc::new(AtomicU32::new(0));

        let mut sup = Supervisor::new(test_config(), bus.clone());
        sup.register(ServiceId::Vision, dead_service(spawns.clone()));
        let handle = tokio::spawn(sup.run());

        // Silence window (3s) + backoff (500ms) + the next watchdog tick
        // must produce a restart
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(spawns.load(Ordering::SeqCst) >= 2);

        bus.publish(Event::Control(ControlSignal::Shutdown));
        let _ = handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_declares_failure() {
        let bus = Bus::new(64);
        let spawns = Arc::new(AtomicU32::new(0));
        let mut ctrl = bus.subscribe(&[Topic::Control]);

        let mut sup = Supervisor::new(test_config(), bus.clone());
        sup.register(ServiceId::Audio, dead_service(spawns.clone()));
        let handle = tokio::spawn(sup.run());

        loop {
            match ctrl.recv().await {
                Some(Event::Control(ControlSignal::ServiceFailed(ServiceId::Audio))) => break,
                Some(_) => continue,
                None => panic!("bus closed"),
            }
        }

        // Initial spawn + max_retries restarts, then no further attempts
        assert_eq!(spawns.load(Ordering::SeqCst), 1 + test_config().max_retries);

        // The only service is fatal, so the supervisor reports failure
        assert!(matches!(
            handle.await.unwrap(),
            Err(SupervisorError::AllServicesFailed)
        ));
    }
}
