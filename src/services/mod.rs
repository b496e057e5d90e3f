//! Services that expose covers to the outside world.
//!
//! - [`CoverRegistry`]: the shared set of covers every service works on
//! - `api`: request and response types shared by web and MQTT
//! - `web` feature: Axum-based HTTP API
//! - `mqtt` feature: MQTT bridge for command topics and retained state
//!
//! All services share one registry behind an `Arc`:
//!
//! ```ignore
//! let registry = Arc::new(CoverRegistry::from_configs(&config.covers, tx)?);
//!
//! let router = build_router(Arc::clone(&registry), &web_config);
//! let bridge = MqttBridge::new(Arc::clone(&registry), config.mqtt.clone());
//! ```

pub mod api;
pub mod registry;

#[cfg(feature = "web")]
pub mod web;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use api::*;
pub use registry::*;

#[cfg(feature = "web")]
pub use web::*;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
