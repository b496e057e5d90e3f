//! Mock transmitter for testing without an RF bridge.
//!
//! [`MockTransmitter`] records every pulse it accepts and can be told to
//! fail or to take time, which is all the controller ever observes of real
//! hardware.
//!
//! # Example
//!
//! ```rust
//! use rf_cover::hal::MockTransmitter;
//! use rf_cover::traits::CommandSink;
//! use rf_cover::DispatchError;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let tx = MockTransmitter::new();
//! tx.send_command("blind", "open").await.unwrap();
//!
//! tx.fail_next(DispatchError::Unavailable("bridge offline".into()));
//! assert!(tx.send_command("blind", "stop").await.is_err());
//!
//! assert_eq!(tx.commands(), vec!["open"]);
//! assert_eq!(tx.attempts(), 2);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::time::{self, Duration, Instant};

use crate::error::DispatchError;
use crate::traits::CommandSink;

/// One pulse a [`MockTransmitter`] accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentCommand {
    /// Device key.
    pub device: String,
    /// Command key.
    pub command: String,
    /// When the dispatch completed.
    pub at: Instant,
}

#[derive(Debug, Default)]
struct MockState {
    sent: Vec<SentCommand>,
    attempts: usize,
    fail_queue: VecDeque<DispatchError>,
    fail_always: Option<DispatchError>,
    latency: Duration,
}

/// Recording transmitter.
///
/// Clones share the same record, so a test can keep one clone and hand the
/// other to a controller.
#[derive(Clone, Debug, Default)]
pub struct MockTransmitter {
    state: Arc<Mutex<MockState>>,
}

impl MockTransmitter {
    /// Create a transmitter that accepts everything instantly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `latency` to confirm each dispatch.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.with_state(|s| s.latency = latency);
        self
    }

    /// Fail the next dispatch with `error`. Queued failures are used in order.
    pub fn fail_next(&self, error: DispatchError) {
        self.with_state(|s| s.fail_queue.push_back(error));
    }

    /// Fail every dispatch with `error` until [`recover`](Self::recover).
    pub fn fail_always(&self, error: DispatchError) {
        self.with_state(|s| s.fail_always = Some(error));
    }

    /// Clear all injected failures.
    pub fn recover(&self) {
        self.with_state(|s| {
            s.fail_queue.clear();
            s.fail_always = None;
        });
    }

    /// Accepted pulses, oldest first.
    pub fn sent(&self) -> Vec<SentCommand> {
        self.with_state(|s| s.sent.clone())
    }

    /// Command keys of the accepted pulses, oldest first.
    pub fn commands(&self) -> Vec<String> {
        self.with_state(|s| s.sent.iter().map(|c| c.command.clone()).collect())
    }

    /// How often `command` was accepted.
    pub fn count(&self, command: &str) -> usize {
        self.with_state(|s| s.sent.iter().filter(|c| c.command == command).count())
    }

    /// Dispatches attempted, failed ones included.
    pub fn attempts(&self) -> usize {
        self.with_state(|s| s.attempts)
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.with_state(|s| {
            s.sent.clear();
            s.attempts = 0;
        });
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

impl CommandSink for MockTransmitter {
    async fn send_command(&self, device: &str, command: &str) -> Result<(), DispatchError> {
        let latency = self.with_state(|s| {
            s.attempts += 1;
            s.latency
        });
        if !latency.is_zero() {
            time::sleep(latency).await;
        }

        self.with_state(|s| {
            if let Some(error) = s.fail_queue.pop_front().or_else(|| s.fail_always.clone()) {
                return Err(error);
            }
            s.sent.push(SentCommand {
                device: device.to_string(),
                command: command.to_string(),
                at: Instant::now(),
            });
            Ok(())
        })
    }
}
