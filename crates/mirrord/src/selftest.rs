//! Self-test entry modes
//!
//! Both bypass the bus and alert manager entirely: they exercise the LED
//! path and the TTS engine directly and exit.

use std::time::Duration;

use tracing::{error, info};

use audio::{SimulatedTts, TextToSpeech};
use hardware_io::{spawn_led_controller, LedConfig, LedPattern, LoggingLedBackend, Rgb};

/// Cycle the LED patterns; exit code 0 on completion
pub async fn run_hardware_test(cfg: &LedConfig) -> i32 {
    info!("hardware self-test starting");
    let (led, _task) = spawn_led_controller(Box::new(LoggingLedBackend), cfg.clone());

    let steps = [
        ("solid green", LedPattern::Solid, Rgb::GREEN),
        ("solid yellow", LedPattern::Solid, Rgb::YELLOW),
        ("solid red", LedPattern::Solid, Rgb::RED),
        ("blink yellow", LedPattern::Blink, Rgb::YELLOW),
        ("breathe red", LedPattern::Breathe, Rgb::RED),
    ];

    for (name, pattern, color) in steps {
        info!(step = name, "led");
        led.set(pattern, color);
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    led.set(LedPattern::Off, Rgb::BLACK);
    tokio::time::sleep(Duration::from_millis(100)).await;
    info!("hardware self-test complete");
    0
}

/// Speak the fixed test phrases; exit code 0 on completion
pub async fn run_audio_test() -> i32 {
    info!("audio self-test starting");
    let mut tts = SimulatedTts::default();

    let phrases = [
        "Hello, I am your smart health monitoring mirror.",
        "This is a test of the text to speech system.",
    ];

    for phrase in phrases {
        match tts.synthesize(phrase) {
            Ok(duration) => tokio::time::sleep(duration).await,
            Err(e) => {
                error!(error = %e, "speech synthesis failed");
                return 1;
            }
        }
    }

    info!("audio self-test complete");
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_self_tests_exit_clean() {
        assert_eq!(run_hardware_test(&LedConfig::default()).await, 0);
        assert_eq!(run_audio_test().await, 0);
    }
}
