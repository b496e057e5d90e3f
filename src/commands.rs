//! Commands a cover accepts and what applying them did.
//!
//! Both network services translate their payloads into a [`CoverCommand`]
//! (see [`crate::parsing`]) and hand it to [`Cover::apply`], so the web API
//! and MQTT behave identically.
//!
//! ```rust
//! use rf_cover::CoverCommand;
//!
//! assert_eq!(CoverCommand::SetPosition(40).to_string(), "set_position(40)");
//! assert!(CoverCommand::Stop.is_immediate());
//! assert!(!CoverCommand::SetPosition(40).is_immediate());
//! ```
//!
//! [`Cover::apply`]: crate::cover::Cover::apply

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::motion::{MoveOutcome, MoveResult};

// ============================================================================
// Cover Command
// ============================================================================

/// A request for a cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "command", content = "position", rename_all = "snake_case")]
pub enum CoverCommand {
    /// Travel to fully open.
    Open,
    /// Travel to fully closed.
    Close,
    /// Halt wherever the cover is.
    Stop,
    /// Travel to a position, after the debounce window.
    SetPosition(u8),
}

impl CoverCommand {
    /// Whether the command acts right away rather than through the debouncer.
    pub fn is_immediate(&self) -> bool {
        !matches!(self, CoverCommand::SetPosition(_))
    }
}

impl fmt::Display for CoverCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverCommand::Open => f.write_str("open"),
            CoverCommand::Close => f.write_str("close"),
            CoverCommand::Stop => f.write_str("stop"),
            CoverCommand::SetPosition(position) => write!(f, "set_position({position})"),
        }
    }
}

// ============================================================================
// Command Outcome
// ============================================================================

/// What applying a [`CoverCommand`] did.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// `open` or `close` was handled by the controller.
    Moved {
        /// Started a move, or found the cover already there.
        result: MoveResult,
    },
    /// `stop` was handled.
    Stopped {
        /// How the interrupted move ended, if one was running.
        interrupted: Option<MoveOutcome>,
    },
    /// A position request is waiting out the debounce window.
    Scheduled {
        /// Debounce token of the request.
        token: u64,
        /// Requested position.
        target: u8,
    },
}
