//! # rf-cover
//!
//! Position tracking and control for motorized covers (blinds, shutters,
//! awnings) that are driven by fire-and-forget RF or IR pulses and report
//! nothing back.
//!
//! ## Features
//!
//! - **Time-based position estimate**: traverse times per direction turn
//!   elapsed motor time into a position, updated on a fixed tick
//! - **Interruptible moves**: stop or retarget mid-move and the estimate is
//!   reconciled from the time actually travelled
//! - **Debounced set-position**: slider drags collapse into one move
//! - **Pluggable transmitters**: Home Assistant remote, MQTT bridge, dry run
//! - **Services**: HTTP API and MQTT bridge over a shared cover registry
//!
//! ## Architecture
//!
//! - `position` - Pure position and duration arithmetic
//! - `state` - Cover state and the snapshot published to clients
//! - `motion` - The timed move task and its outcome
//! - `controller` - Owns the state, sends pulses, runs one move at a time
//! - `debounce` - Coalesces position requests
//! - `cover` - One configured cover: controller plus debouncer
//! - `traits` / `hal` - The transmitter contract and its implementations
//! - `services` - Registry, web API and MQTT bridge
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use rf_cover::{CommandKeys, Cover, CoverCommand, CoverConfig};
//! use rf_cover::hal::MockTransmitter;
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() {
//! let config = CoverConfig::new("Living Room")
//!     .with_commands(CommandKeys::for_device("living_room_blind"))
//!     .with_traverse_secs(20.0, 18.0);
//! let tx = MockTransmitter::new();
//! let cover = Cover::new(&config, tx.clone()).unwrap();
//!
//! cover.apply(CoverCommand::Open).await.unwrap();
//! tokio::time::sleep(Duration::from_secs(5)).await;
//! cover.apply(CoverCommand::Stop).await.unwrap();
//!
//! assert_eq!(cover.snapshot().position, 25);
//! assert_eq!(tx.commands(), vec!["open", "stop"]);
//! # }
//! ```

#![warn(missing_docs)]

/// Commands a cover accepts and their outcomes.
pub mod commands;
/// File configuration with builders, TOML loading and validation.
pub mod config;
/// The move controller that owns a cover's position estimate.
pub mod controller;
/// One configured cover: identity, controller and debouncer.
pub mod cover;
/// Token-based coalescing of position requests.
pub mod debounce;
/// Error types.
pub mod error;
/// Transmitter implementations.
pub mod hal;
/// Timed moves and their outcomes.
pub mod motion;
/// Payload parsing for the web API and MQTT.
pub mod parsing;
/// Position and duration arithmetic.
pub mod position;
/// Cover state and published snapshots.
pub mod state;
/// The transmitter contract.
pub mod traits;
/// Runtime-selected transmitter.
pub mod transmitter_dyn;

/// Cover registry, web API and MQTT bridge.
pub mod services;

pub use commands::{CommandOutcome, CoverCommand};
pub use config::{CommandKeys, Config, CoverConfig, MqttConfig, TransmitterConfig, WebConfig};
pub use controller::MoveController;
pub use cover::Cover;
pub use debounce::{PendingRequest, RequestDebouncer};
pub use error::{ConfigError, CoverError, DispatchError};
pub use motion::{MoveOutcome, MovePlan, MoveResult};
pub use position::{Direction, PersistedPosition};
pub use state::{CoverSnapshot, CoverState};
pub use traits::{CommandSink, Pulse};
pub use transmitter_dyn::AnyTransmitter;
