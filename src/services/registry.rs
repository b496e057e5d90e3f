//! Shared set of covers for all services.
//!
//! `CoverRegistry` is built once at startup and handed to the web server and
//! the MQTT bridge behind an `Arc`. Each [`Cover`] serializes its own
//! operations, so the registry itself needs no lock.
//!
//! # Example
//!
//! ```rust
//! use rf_cover::{CommandKeys, CoverConfig};
//! use rf_cover::hal::MockTransmitter;
//! use rf_cover::services::CoverRegistry;
//!
//! let configs = vec![
//!     CoverConfig::new("Office").with_commands(CommandKeys::for_device("office")),
//!     CoverConfig::new("Bedroom").with_commands(CommandKeys::for_device("bedroom")),
//! ];
//! let registry = CoverRegistry::from_configs(&configs, MockTransmitter::new()).unwrap();
//! assert_eq!(registry.len(), 2);
//! assert!(registry.get("office").is_ok());
//! ```

use std::sync::Arc;

use tracing::info;

use crate::commands::{CommandOutcome, CoverCommand};
use crate::config::CoverConfig;
use crate::cover::Cover;
use crate::error::CoverError;
use crate::state::CoverSnapshot;
use crate::traits::CommandSink;

/// Covers by id, in configuration order.
pub struct CoverRegistry<S: CommandSink> {
    covers: Vec<Arc<Cover<S>>>,
}

impl<S: CommandSink> Default for CoverRegistry<S> {
    fn default() -> Self {
        Self { covers: Vec::new() }
    }
}

impl<S: CommandSink> CoverRegistry<S> {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// One cover per config, all sharing clones of `sink`.
    pub fn from_configs(configs: &[CoverConfig], sink: S) -> Result<Self, CoverError>
    where
        S: Clone,
    {
        let mut registry = Self::new();
        for config in configs {
            registry.insert(Cover::new(config, sink.clone())?)?;
        }
        Ok(registry)
    }

    /// Add a cover. Ids must be unique.
    pub fn insert(&mut self, cover: Cover<S>) -> Result<Arc<Cover<S>>, CoverError> {
        if self.covers.iter().any(|c| c.id() == cover.id()) {
            return Err(CoverError::InvalidConfig(format!(
                "duplicate cover id '{}'",
                cover.id()
            )));
        }
        let cover = Arc::new(cover);
        self.covers.push(Arc::clone(&cover));
        Ok(cover)
    }

    /// Look up a cover by id.
    pub fn get(&self, id: &str) -> Result<&Arc<Cover<S>>, CoverError> {
        self.covers
            .iter()
            .find(|c| c.id() == id)
            .ok_or_else(|| CoverError::UnknownCover(id.to_string()))
    }

    /// Covers in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Cover<S>>> {
        self.covers.iter()
    }

    /// Number of covers.
    pub fn len(&self) -> usize {
        self.covers.len()
    }

    /// Whether no cover is registered.
    pub fn is_empty(&self) -> bool {
        self.covers.is_empty()
    }

    /// Current snapshot of every cover, keyed by id.
    pub fn snapshots(&self) -> Vec<(String, CoverSnapshot)> {
        self.covers
            .iter()
            .map(|c| (c.id().to_string(), c.snapshot()))
            .collect()
    }

    /// Apply a command to the cover with this id.
    pub async fn apply(&self, id: &str, command: CoverCommand) -> Result<CommandOutcome, CoverError> {
        self.get(id)?.apply(command).await
    }

    /// Drop pending requests and cancel running moves on every cover.
    pub async fn shutdown(&self) {
        for cover in &self.covers {
            cover.shutdown().await;
        }
        info!(covers = self.covers.len(), "all covers shut down");
    }
}
