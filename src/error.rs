//! Error types for transmitters, covers and configuration.

use thiserror::Error;

/// Failure reported by a [`CommandSink`](crate::traits::CommandSink).
///
/// A failed directional pulse never advances the position estimate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The transmitter (or the service in front of it) refused the command.
    #[error("command rejected: {0}")]
    Rejected(String),
    /// The command could not be delivered.
    #[error("transport error: {0}")]
    Transport(String),
    /// The transmitter is not reachable or not ready.
    #[error("transmitter unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by cover operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoverError {
    /// The transmitter failed to dispatch a pulse.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// The device key or the command key for a pulse is not configured.
    ///
    /// Controllers log this and skip the pulse rather than failing the call.
    #[error("missing device or command '{command}'")]
    MissingCommand {
        /// Pulse whose key is missing (`open`, `close` or `stop`).
        command: &'static str,
    },
    /// A cover was constructed from an invalid configuration.
    #[error("invalid cover config: {0}")]
    InvalidConfig(String),
    /// No cover with this id is registered.
    #[error("unknown cover '{0}'")]
    UnknownCover(String),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The config file is not valid TOML or does not match the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The config parsed but failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}
