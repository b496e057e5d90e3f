//! Runtime-selected transmitter.
//!
//! [`CommandSink`] returns `impl Future`, so it cannot be used as a trait
//! object. The daemon picks its transmitter from configuration at startup,
//! which [`AnyTransmitter`] covers with plain enum dispatch.
//!
//! ```rust
//! use rf_cover::{AnyTransmitter, TransmitterConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let tx = AnyTransmitter::from_config(&TransmitterConfig::Log).unwrap();
//! assert_eq!(tx.kind(), "log");
//! # }
//! ```

use crate::config::TransmitterConfig;
use crate::error::{ConfigError, DispatchError};
use crate::hal::{LoggingTransmitter, MockTransmitter};
use crate::traits::CommandSink;

#[cfg(feature = "hass")]
use crate::hal::HassTransmitter;
#[cfg(feature = "mqtt")]
use crate::hal::MqttTransmitter;

/// Any of the transmitters this crate ships.
pub enum AnyTransmitter {
    /// Dry run.
    Log(LoggingTransmitter),
    /// Recording mock.
    Mock(MockTransmitter),
    /// Home Assistant remote entity.
    #[cfg(feature = "hass")]
    Hass(HassTransmitter),
    /// MQTT-attached RF bridge.
    #[cfg(feature = "mqtt")]
    Mqtt(MqttTransmitter),
}

impl AnyTransmitter {
    /// Build the transmitter a config asks for.
    ///
    /// Fails if the config names a transmitter whose feature is not compiled
    /// in. The MQTT transmitter must be built inside a tokio runtime.
    pub fn from_config(config: &TransmitterConfig) -> Result<Self, ConfigError> {
        match config {
            TransmitterConfig::Log => Ok(Self::Log(LoggingTransmitter::new())),
            #[cfg(feature = "hass")]
            TransmitterConfig::Hass {
                base_url,
                token,
                remote_entity_id,
            } => HassTransmitter::new(base_url, token, remote_entity_id)
                .map(Self::Hass)
                .map_err(|e| ConfigError::Invalid(e.to_string())),
            #[cfg(not(feature = "hass"))]
            TransmitterConfig::Hass { .. } => Err(ConfigError::Invalid(
                "transmitter kind 'hass' needs the `hass` feature".into(),
            )),
            #[cfg(feature = "mqtt")]
            TransmitterConfig::Mqtt {
                host,
                port,
                client_id,
                topic,
            } => Ok(Self::Mqtt(MqttTransmitter::connect(
                host, *port, client_id, topic,
            ))),
            #[cfg(not(feature = "mqtt"))]
            TransmitterConfig::Mqtt { .. } => Err(ConfigError::Invalid(
                "transmitter kind 'mqtt' needs the `mqtt` feature".into(),
            )),
        }
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Log(_) => "log",
            Self::Mock(_) => "mock",
            #[cfg(feature = "hass")]
            Self::Hass(_) => "hass",
            #[cfg(feature = "mqtt")]
            Self::Mqtt(_) => "mqtt",
        }
    }
}

impl From<LoggingTransmitter> for AnyTransmitter {
    fn from(tx: LoggingTransmitter) -> Self {
        Self::Log(tx)
    }
}

impl From<MockTransmitter> for AnyTransmitter {
    fn from(tx: MockTransmitter) -> Self {
        Self::Mock(tx)
    }
}

impl CommandSink for AnyTransmitter {
    async fn send_command(&self, device: &str, command: &str) -> Result<(), DispatchError> {
        match self {
            Self::Log(tx) => tx.send_command(device, command).await,
            Self::Mock(tx) => tx.send_command(device, command).await,
            #[cfg(feature = "hass")]
            Self::Hass(tx) => tx.send_command(device, command).await,
            #[cfg(feature = "mqtt")]
            Self::Mqtt(tx) => tx.send_command(device, command).await,
        }
    }
}
