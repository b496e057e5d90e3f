//! Payload parsing shared by the web API and the MQTT bridge.
//!
//! Home automation tools are loose about payloads: the same `set position`
//! might arrive as `40`, `" 40\n"`, `40.0` or `{"position": 40}`. Everything
//! here accepts those forms and rejects anything out of range.

use serde::Deserialize;

use crate::commands::CoverCommand;

#[derive(Deserialize)]
struct PositionBody {
    position: f64,
}

#[derive(Deserialize)]
struct CommandBody {
    command: String,
}

/// Parse an `open` / `close` / `stop` payload.
///
/// Accepts the bare word in any case (`OPEN`, `close`) or a JSON object like
/// `{"command": "stop"}`.
///
/// ```rust
/// use rf_cover::{parsing::parse_command, CoverCommand};
///
/// assert_eq!(parse_command("OPEN"), Some(CoverCommand::Open));
/// assert_eq!(parse_command(r#"{"command":"stop"}"#), Some(CoverCommand::Stop));
/// assert_eq!(parse_command("toggle"), None);
/// ```
pub fn parse_command(payload: &str) -> Option<CoverCommand> {
    let payload = payload.trim();
    if let Ok(body) = serde_json::from_str::<CommandBody>(payload) {
        return command_word(&body.command);
    }
    command_word(payload.trim_matches('"'))
}

fn command_word(word: &str) -> Option<CoverCommand> {
    match word.trim().to_ascii_lowercase().as_str() {
        "open" => Some(CoverCommand::Open),
        "close" => Some(CoverCommand::Close),
        "stop" => Some(CoverCommand::Stop),
        _ => None,
    }
}

/// Parse a position payload into a whole percentage.
///
/// Accepts a bare number or `{"position": n}`. Fractions are rounded.
/// Values outside `0..=100` and non-numbers are rejected.
pub fn parse_position(payload: &str) -> Option<u8> {
    let payload = payload.trim();
    let value = match serde_json::from_str::<PositionBody>(payload) {
        Ok(body) => body.position,
        Err(_) => payload.trim_matches('"').trim().parse::<f64>().ok()?,
    };
    position_value(value)
}

/// Validate a numeric position.
pub fn position_value(value: f64) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    (0.0..=100.0).contains(&rounded).then_some(rounded as u8)
}
