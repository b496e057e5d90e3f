//! API request and response types shared by the web API and MQTT.

use serde::{Deserialize, Serialize};

use crate::commands::CommandOutcome;
use crate::cover::Cover;
use crate::state::CoverSnapshot;
use crate::traits::CommandSink;

// ============================================================================
// Response Types
// ============================================================================

/// API response wrapper for consistent JSON structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (present when success=true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present when success=false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// State of one cover, as published to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverStateResponse {
    /// Cover id
    pub id: String,
    /// Display name
    pub name: String,
    /// Position in whole percent (0 closed, 100 open)
    pub position: u8,
    /// `open`, `opening`, `closed` or `closing`
    pub state: String,
    /// Whether a move is in progress
    pub moving: bool,
    /// Moving towards open
    pub opening: bool,
    /// Moving towards closed
    pub closing: bool,
    /// Exactly fully closed
    pub closed: bool,
}

impl CoverStateResponse {
    /// Build from a cover's identity and a snapshot.
    pub fn new(id: &str, name: &str, snapshot: &CoverSnapshot) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            position: snapshot.position,
            state: snapshot.state_str().to_string(),
            moving: snapshot.moving,
            opening: snapshot.opening,
            closing: snapshot.closing,
            closed: snapshot.closed,
        }
    }
}

impl<S: CommandSink> From<&Cover<S>> for CoverStateResponse {
    fn from(cover: &Cover<S>) -> Self {
        Self::new(cover.id(), cover.name(), &cover.snapshot())
    }
}

/// Command result response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Whether the command was accepted
    pub accepted: bool,
    /// Result details
    pub result: String,
}

impl CommandResponse {
    /// Accepted with a short result tag.
    pub fn accepted(result: impl Into<String>) -> Self {
        Self {
            accepted: true,
            result: result.into(),
        }
    }
}

impl From<&CommandOutcome> for CommandResponse {
    fn from(outcome: &CommandOutcome) -> Self {
        use crate::motion::MoveResult;

        let result = match outcome {
            CommandOutcome::Moved {
                result: MoveResult::Started { .. },
            } => "move_started",
            CommandOutcome::Moved {
                result: MoveResult::Unchanged { .. },
            } => "unchanged",
            CommandOutcome::Stopped { .. } => "stopped",
            CommandOutcome::Scheduled { .. } => "scheduled",
        };
        Self::accepted(result)
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST /api/covers/:id/position`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetPositionRequest {
    /// Target position, 0 to 100
    pub position: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{MoveOutcome, MoveResult};
    use crate::state::CoverState;

    #[test]
    fn api_response_skips_empty_fields() {
        let ok = serde_json::to_value(ApiResponse::ok(1)).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "data": 1}));

        let err = serde_json::to_value(ApiResponse::<()>::err("boom")).unwrap();
        assert_eq!(err, serde_json::json!({"success": false, "error": "boom"}));
    }

    #[test]
    fn state_response_from_snapshot() {
        let mut state = CoverState::new(42.4);
        state.begin(crate::position::Direction::Close);
        let resp = CoverStateResponse::new("den", "Den", &state.snapshot());
        assert_eq!(resp.position, 42);
        assert_eq!(resp.state, "closing");
        assert!(resp.moving && resp.closing && !resp.opening && !resp.closed);
    }

    #[test]
    fn command_response_tags() {
        let started = CommandOutcome::Moved {
            result: MoveResult::Started {
                direction: crate::position::Direction::Open,
                from: 0.0,
                to: 100.0,
                duration: std::time::Duration::from_secs(1),
            },
        };
        assert_eq!(CommandResponse::from(&started).result, "move_started");

        let stopped = CommandOutcome::Stopped {
            interrupted: Some(MoveOutcome::Completed { position: 100.0 }),
        };
        assert_eq!(CommandResponse::from(&stopped).result, "stopped");

        let req: SetPositionRequest = serde_json::from_str(r#"{"position": 30}"#).unwrap();
        assert_eq!(req.position, 30.0);
    }
}
