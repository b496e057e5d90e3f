//! Dry-run transmitter.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use crate::error::DispatchError;
use crate::traits::CommandSink;

/// Logs each pulse at `info` instead of sending it.
///
/// Used by `rf-cover --dry-run` and when no transmitter is configured, so a
/// config can be tried out without touching the covers.
#[derive(Debug, Default)]
pub struct LoggingTransmitter {
    sent: AtomicU64,
}

impl LoggingTransmitter {
    /// Create a logging transmitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulses logged so far.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

impl CommandSink for LoggingTransmitter {
    async fn send_command(&self, device: &str, command: &str) -> Result<(), DispatchError> {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        info!(device, command, n, "pulse (dry run)");
        Ok(())
    }
}
