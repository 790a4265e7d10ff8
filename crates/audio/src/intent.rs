//! Transcript-to-intent mapping

use message_bus::CommandIntent;

/// Map a transcript onto the fixed command vocabulary.
///
/// Keyword patterns, not grammar: the ASR output for short commands is
/// noisy enough that substring matching outperforms anything stricter.
pub fn parse_intent(text: &str) -> CommandIntent {
    let lower = text.to_lowercase();

    if lower.contains("status") || lower.contains("how am i") {
        CommandIntent::StatusQuery
    } else if lower.contains("okay")
        || lower.contains("fine")
        || lower.contains("dismiss")
        || lower.contains("acknowledged")
    {
        CommandIntent::Acknowledge
    } else if lower.contains("timer") {
        CommandIntent::SetTimer
    } else if lower.contains("stop") || lower.contains("sleep") || lower.contains("pause") {
        CommandIntent::StopMonitoring
    } else {
        CommandIntent::Unrecognized
    }
}
