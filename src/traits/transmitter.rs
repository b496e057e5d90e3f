//! The transmitter contract: fire-and-forget RF/IR pulses.
//!
//! A cover has no position feedback. All the controller can do is ask a
//! transmitter to send a named code and wait until the transmitter confirms
//! the dispatch (or fails).
//!
//! # Example Implementation
//!
//! ```rust,ignore
//! use rf_cover::traits::CommandSink;
//! use rf_cover::DispatchError;
//!
//! struct MyBridge { /* serial port, socket, ... */ }
//!
//! impl CommandSink for MyBridge {
//!     async fn send_command(&self, device: &str, command: &str) -> Result<(), DispatchError> {
//!         // write the code and wait for the bridge to acknowledge it
//!         Ok(())
//!     }
//! }
//! ```

use core::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::position::Direction;

/// Dispatches named codes to a transmitter.
///
/// `send_command` must only resolve once the transmitter has accepted the
/// code. The controller never has two pulses outstanding at once.
pub trait CommandSink: Send + Sync + 'static {
    /// Send the code `command` learned for `device`.
    fn send_command(
        &self,
        device: &str,
        command: &str,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;
}

impl<T: CommandSink> CommandSink for Arc<T> {
    fn send_command(
        &self,
        device: &str,
        command: &str,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send {
        (**self).send_command(device, command)
    }
}

/// One of the three codes a cover understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pulse {
    /// Start moving towards open.
    Open,
    /// Start moving towards closed.
    Close,
    /// Halt the motor.
    Stop,
}

impl Pulse {
    /// Lowercase pulse name (`open`, `close`, `stop`).
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Pulse::Open => "open",
            Pulse::Close => "close",
            Pulse::Stop => "stop",
        }
    }
}

impl From<Direction> for Pulse {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Open => Pulse::Open,
            Direction::Close => Pulse::Close,
        }
    }
}
