//! Service wiring and the main run loop

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info};

use alerting::{AlertManager, Outcome};
use audio::{spawn_playback, AudioService, SimulatedTts};
use hardware_io::{spawn_button_worker, spawn_led_controller, LoggingLedBackend};
use message_bus::{Bus, ControlSignal, Event, ServiceId};
use supervisor::Supervisor;
use vision::VisionService;

use crate::MirrorConfig;

/// Run the appliance until shutdown; returns the process exit code.
///
/// Exit codes: 0 for a clean shutdown (very-long press or interrupt),
/// non-zero when the supervisor reports an unrecoverable condition.
pub async fn run(cfg: MirrorConfig) -> i32 {
    let bus = Bus::new(cfg.bus_capacity);

    let (led, _led_task) =
        spawn_led_controller(Box::new(LoggingLedBackend), cfg.led.clone());
    let (speech, _playback_task) = spawn_playback(
        Box::new(SimulatedTts::default()),
        cfg.audio.speech_queue_depth,
    );

    // The external GPIO adapter feeds raw edges through this sender; it
    // must stay alive for the lifetime of the run.
    let (_edge_tx, edge_rx) = mpsc::channel(16);
    let _button_task = spawn_button_worker(bus.clone(), edge_rx, cfg.button.clone());

    let mut supervisor = Supervisor::new(cfg.supervisor.clone(), bus.clone());
    {
        let bus = bus.clone();
        let vision_cfg = cfg.vision.clone();
        supervisor.register(
            ServiceId::Vision,
            Box::new(move || {
                let service = VisionService::simulated(vision_cfg.clone(), bus.clone());
                tokio::spawn(async move {
                    if let Err(e) = service.run().await {
                        error!(error = %e, "vision service exited");
                    }
                })
            }),
        );
    }
    {
        let bus = bus.clone();
        let audio_cfg = cfg.audio.clone();
        supervisor.register(
            ServiceId::Audio,
            Box::new(move || {
                let service = AudioService::simulated(audio_cfg.clone(), bus.clone());
                tokio::spawn(async move {
                    if let Err(e) = service.run().await {
                        error!(error = %e, "audio service exited");
                    }
                })
            }),
        );
    }

    let manager = AlertManager::new(cfg.alerts.clone(), bus.clone(), led, speech.clone());
    let manager_task = tokio::spawn(manager.run());
    let supervisor_task = tokio::spawn(supervisor.run());

    speech.say("System ready. Monitoring started.");
    info!("system fully operational");

    tokio::select! {
        outcome = manager_task => {
            match outcome {
                Ok(Outcome::Shutdown) => {
                    info!("clean shutdown");
                    0
                }
                Err(e) => {
                    error!(error = %e, "alert manager task failed");
                    1
                }
            }
        }
        result = supervisor_task => {
            match result {
                Ok(Ok(())) => 0,
                Ok(Err(e)) => {
                    error!(error = %e, "unrecoverable supervisor condition");
                    1
                }
                Err(e) => {
                    error!(error = %e, "supervisor task failed");
                    1
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            bus.publish(Event::Control(ControlSignal::Shutdown));
            // Give services one cycle to acknowledge and release devices
            tokio::time::sleep(Duration::from_millis(cfg.alerts.shutdown_ack_timeout_ms)).await;
            0
        }
    }
}
