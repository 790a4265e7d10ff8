//! Level-to-feedback mapping

use hardware_io::{LedPattern, Rgb};
use message_bus::{FatigueLevel, ServiceId};

use crate::AlertState;

/// LED feedback per level
pub fn led_for(level: FatigueLevel) -> (LedPattern, Rgb) {
    match level {
        FatigueLevel::Normal => (LedPattern::Solid, Rgb::GREEN),
        FatigueLevel::Mild => (LedPattern::Blink, Rgb::YELLOW),
        FatigueLevel::Severe => (LedPattern::Breathe, Rgb::RED),
    }
}

/// Spoken warning per level, None for Normal
pub fn warning_for(level: FatigueLevel) -> Option<&'static str> {
    match level {
        FatigueLevel::Normal => None,
        FatigueLevel::Mild => {
            Some("You're showing mild signs of fatigue. Consider taking a break soon.")
        }
        FatigueLevel::Severe => {
            Some("You appear quite fatigued. Please take a break immediately.")
        }
    }
}

/// Spoken answer to a status query
pub fn status_message(state: &AlertState) -> String {
    let base = match state.level {
        FatigueLevel::Normal => "Everything looks normal. You seem alert and well.",
        FatigueLevel::Mild => {
            "You're showing mild signs of fatigue. Consider taking a break soon."
        }
        FatigueLevel::Severe => "You appear quite fatigued. Please take a break immediately.",
    };
    if state.paused {
        format!("Monitoring is paused. {}", base)
    } else {
        base.to_string()
    }
}

/// One-time spoken notice when the supervisor gives up on a service
pub fn failure_notice(service: ServiceId) -> String {
    format!(
        "The {} service has stopped working and has been disabled.",
        service.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_led_mapping() {
        assert_eq!(led_for(FatigueLevel::Normal), (LedPattern::Solid, Rgb::GREEN));
        assert_eq!(led_for(FatigueLevel::Mild), (LedPattern::Blink, Rgb::YELLOW));
        assert_eq!(led_for(FatigueLevel::Severe), (LedPattern::Breathe, Rgb::RED));
    }

    #[test]
    fn test_normal_has_no_warning() {
        assert!(warning_for(FatigueLevel::Normal).is_none());
        assert!(warning_for(FatigueLevel::Severe).is_some());
    }

    #[test]
    fn test_paused_status_prefix() {
        let state = AlertState {
            paused: true,
            ..Default::default()
        };
        assert!(status_message(&state).starts_with("Monitoring is paused."));
    }
}
