//! Transmitter implementations.
//!
//! Concrete implementations of [`CommandSink`](crate::traits::CommandSink):
//!
//! - `mock`: recording transmitter for tests
//! - `logging`: logs pulses instead of sending them (dry run)
//! - `hass`: Home Assistant `remote.send_command` (requires `hass` feature)
//! - `mqtt`: publishes pulses to an MQTT topic (requires `mqtt` feature)

pub mod logging;
pub mod mock;

#[cfg(feature = "hass")]
pub mod hass;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use logging::*;
pub use mock::*;

#[cfg(feature = "hass")]
pub use hass::*;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
