//! Configuration for covers, the transmitter and the network services.
//!
//! Every struct has sensible defaults and `with_*` builder methods, and all
//! of it deserializes from TOML.
//!
//! # Example
//!
//! ```rust
//! use rf_cover::config::{CommandKeys, Config, CoverConfig, WebConfig};
//!
//! let config = Config::default()
//!     .with_cover(
//!         CoverConfig::new("Living Room")
//!             .with_commands(CommandKeys::new("living_blind", "up", "down", "halt"))
//!             .with_traverse_secs(22.0, 20.0),
//!     )
//!     .with_web(WebConfig::default().with_port(3000));
//!
//! assert_eq!(config.covers[0].id, "living_room");
//! assert!(config.validate().is_ok());
//! ```
//!
//! The same configuration in TOML:
//!
//! ```toml
//! [transmitter]
//! kind = "log"
//!
//! [web]
//! port = 3000
//!
//! [[covers]]
//! name = "Living Room"
//! open_time_secs = 22.0
//! close_time_secs = 20.0
//!
//! [covers.commands]
//! device = "living_blind"
//! open = "up"
//! close = "down"
//! stop = "halt"
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoverError};
use crate::position::{PersistedPosition, MAX_TRAVERSE_SECS};
use crate::traits::Pulse;

/// Turn a display name into an id: lowercase, spaces become underscores.
pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Longest accepted debounce window or tick interval, one day.
pub const MAX_INTERVAL_MS: u64 = 86_400_000;

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configured covers
    pub covers: Vec<CoverConfig>,
    /// Transmitter used to send pulses
    pub transmitter: TransmitterConfig,
    /// HTTP API configuration
    pub web: WebConfig,
    /// MQTT bridge configuration
    pub mqtt: MqttConfig,
}

impl Config {
    /// Read, parse and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text.
    ///
    /// Covers without an explicit `id` get one derived from their name.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(text)?;
        for cover in &mut config.covers {
            if cover.id.trim().is_empty() {
                cover.id = slugify(&cover.name);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Check every cover and require unique ids.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for cover in &self.covers {
            cover
                .validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            if !seen.insert(cover.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate cover id '{}'",
                    cover.id
                )));
            }
        }
        Ok(())
    }

    /// Add a cover
    pub fn with_cover(mut self, cover: CoverConfig) -> Self {
        self.covers.push(cover);
        self
    }

    /// Set transmitter configuration
    pub fn with_transmitter(mut self, transmitter: TransmitterConfig) -> Self {
        self.transmitter = transmitter;
        self
    }

    /// Set web configuration
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }
}

// ============================================================================
// Command Keys
// ============================================================================

/// Names of the learned codes for one cover.
///
/// `device` addresses the learned-code group on the transmitter; the other
/// three name the codes inside it. Any of them may be missing, in which case
/// the matching pulse is skipped with a warning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandKeys {
    /// Device key on the transmitter
    pub device: Option<String>,
    /// Code that starts opening
    pub open: Option<String>,
    /// Code that starts closing
    pub close: Option<String>,
    /// Code that halts the motor
    pub stop: Option<String>,
}

impl CommandKeys {
    /// Fully configured keys
    pub fn new(device: &str, open: &str, close: &str, stop: &str) -> Self {
        Self {
            device: Some(device.to_string()),
            open: Some(open.to_string()),
            close: Some(close.to_string()),
            stop: Some(stop.to_string()),
        }
    }

    /// Keys whose codes are literally named `open`, `close` and `stop`.
    pub fn for_device(device: &str) -> Self {
        Self::new(device, "open", "close", "stop")
    }

    /// Set the stop code, or clear it with `None`
    pub fn with_stop(mut self, stop: Option<&str>) -> Self {
        self.stop = stop.map(str::to_string);
        self
    }

    /// Device key and command key for a pulse.
    ///
    /// Empty strings count as missing.
    pub fn resolve(&self, pulse: Pulse) -> Result<(&str, &str), CoverError> {
        let command = match pulse {
            Pulse::Open => &self.open,
            Pulse::Close => &self.close,
            Pulse::Stop => &self.stop,
        };
        match (present(&self.device), present(command)) {
            (Some(device), Some(command)) => Ok((device, command)),
            _ => Err(CoverError::MissingCommand {
                command: pulse.as_str(),
            }),
        }
    }
}

fn present(key: &Option<String>) -> Option<&str> {
    key.as_deref().filter(|k| !k.trim().is_empty())
}

// ============================================================================
// Cover Config
// ============================================================================

/// Configuration of one cover.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    /// Stable identifier used in API paths and MQTT topics
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Learned code names
    pub commands: CommandKeys,
    /// Seconds to travel from fully closed to fully open
    pub open_time_secs: f64,
    /// Seconds to travel from fully open to fully closed
    pub close_time_secs: f64,
    /// Interval between position updates during a move, in milliseconds
    pub tick_interval_ms: u64,
    /// Quiet period before a position request becomes a move, in milliseconds
    pub debounce_ms: u64,
    /// Instant nudge towards the target when a move starts (0 = off)
    pub bump: f64,
    /// Position to start from, as previously saved
    pub initial_position: Option<PersistedPosition>,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            commands: CommandKeys::default(),
            open_time_secs: 35.0,
            close_time_secs: 34.0,
            tick_interval_ms: 250,
            debounce_ms: 2500,
            bump: 0.0,
            initial_position: None,
        }
    }
}

impl CoverConfig {
    /// New cover config; the id is derived from the name.
    pub fn new(name: &str) -> Self {
        Self {
            id: slugify(name),
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Override the id
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Set the code names
    pub fn with_commands(mut self, commands: CommandKeys) -> Self {
        self.commands = commands;
        self
    }

    /// Set open and close traverse times in seconds
    pub fn with_traverse_secs(mut self, open: f64, close: f64) -> Self {
        self.open_time_secs = open;
        self.close_time_secs = close;
        self
    }

    /// Set the tick interval
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Set the debounce window
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the start-of-move bump
    pub fn with_bump(mut self, bump: f64) -> Self {
        self.bump = bump;
        self
    }

    /// Set the persisted starting position
    pub fn with_initial_position(mut self, position: PersistedPosition) -> Self {
        self.initial_position = Some(position);
        self
    }

    /// Tick interval as a `Duration`
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Debounce window as a `Duration`
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Reject configurations the controller cannot run with.
    pub fn validate(&self) -> Result<(), CoverError> {
        if self.id.trim().is_empty() {
            return Err(CoverError::InvalidConfig("cover id is empty".into()));
        }
        let in_range = |v: f64| v.is_finite() && v > 0.0 && v <= MAX_TRAVERSE_SECS;
        if !in_range(self.open_time_secs) || !in_range(self.close_time_secs) {
            return Err(CoverError::InvalidConfig(format!(
                "{}: traverse times must be in (0, {MAX_TRAVERSE_SECS}] s (open {}, close {})",
                self.id, self.open_time_secs, self.close_time_secs
            )));
        }
        if self.debounce_ms > MAX_INTERVAL_MS {
            return Err(CoverError::InvalidConfig(format!(
                "{}: debounce window must be at most {MAX_INTERVAL_MS} ms",
                self.id
            )));
        }
        if self.tick_interval_ms == 0 || self.tick_interval_ms > MAX_INTERVAL_MS {
            return Err(CoverError::InvalidConfig(format!(
                "{}: tick interval must be in (0, {MAX_INTERVAL_MS}] ms",
                self.id
            )));
        }
        if !(0.0..100.0).contains(&self.bump) {
            return Err(CoverError::InvalidConfig(format!(
                "{}: bump must be in [0, 100)",
                self.id
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Transmitter Config
// ============================================================================

/// Which transmitter carries the pulses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransmitterConfig {
    /// Log pulses instead of sending them
    #[default]
    Log,
    /// Home Assistant `remote.send_command` (needs the `hass` feature)
    Hass {
        /// Base URL, e.g. `http://homeassistant.local:8123`
        base_url: String,
        /// Long-lived access token
        token: String,
        /// Remote entity that owns the learned codes, e.g. `remote.broadlink`
        remote_entity_id: String,
    },
    /// Publish pulses to an MQTT topic (needs the `mqtt` feature)
    Mqtt {
        /// Broker hostname or IP
        host: String,
        /// Broker port
        #[serde(default = "default_mqtt_port")]
        port: u16,
        /// Client ID
        #[serde(default = "default_transmitter_client_id")]
        client_id: String,
        /// Topic the pulses are published to
        topic: String,
    },
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_transmitter_client_id() -> String {
    "rf-cover-tx".to_string()
}

// ============================================================================
// Web Config
// ============================================================================

/// Web server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Whether the HTTP API is started
    pub enabled: bool,
    /// Port to listen on
    pub port: u16,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
            cors_permissive: true,
        }
    }
}

impl WebConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set CORS mode
    pub fn with_cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }

    /// Enable or disable web server
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT bridge configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Whether the MQTT bridge is started
    pub enabled: bool,
    /// Broker hostname or IP
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client ID (should be unique per instance)
    pub client_id: String,
    /// Topic prefix, e.g. "cover" -> "cover/living_room/state"
    pub topic_prefix: String,
    /// Full-state republish interval in milliseconds
    pub heartbeat_ms: u64,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 1883,
            client_id: "rf-cover".to_string(),
            topic_prefix: "cover".to_string(),
            heartbeat_ms: 30_000,
            keep_alive_secs: 30,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the topic prefix
    pub fn with_topic_prefix(mut self, prefix: &str) -> Self {
        self.topic_prefix = prefix.to_string();
        self
    }

    /// Enable or disable the bridge
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Topic for one cover, e.g. `cover/living_room/state`
    pub fn cover_topic(&self, cover_id: &str, suffix: &str) -> String {
        format!("{}/{}/{}", self.topic_prefix, cover_id, suffix)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_cover_config() {
        let cover = CoverConfig::default();
        assert_eq!(cover.open_time_secs, 35.0);
        assert_eq!(cover.close_time_secs, 34.0);
        assert_eq!(cover.tick_interval(), Duration::from_millis(250));
        assert_eq!(cover.debounce_window(), Duration::from_millis(2500));
        assert_eq!(cover.bump, 0.0);
        assert!(cover.initial_position.is_none());
    }

    #[test]
    fn id_is_slug_of_name() {
        let cover = CoverConfig::new("  Kitchen Blind ");
        assert_eq!(cover.id, "kitchen_blind");
        assert_eq!(cover.name, "  Kitchen Blind ");
    }

    #[test]
    fn resolve_command_keys() {
        let keys = CommandKeys::new("blind", "up", "down", "halt");
        assert_eq!(keys.resolve(Pulse::Open).unwrap(), ("blind", "up"));
        assert_eq!(keys.resolve(Pulse::Close).unwrap(), ("blind", "down"));
        assert_eq!(keys.resolve(Pulse::Stop).unwrap(), ("blind", "halt"));
    }

    #[test]
    fn missing_keys_do_not_resolve() {
        let keys = CommandKeys::for_device("blind").with_stop(None);
        assert_eq!(
            keys.resolve(Pulse::Stop),
            Err(CoverError::MissingCommand { command: "stop" })
        );

        let keys = CommandKeys {
            device: Some("  ".into()),
            ..CommandKeys::for_device("x")
        };
        assert!(keys.resolve(Pulse::Open).is_err());

        assert!(CommandKeys::default().resolve(Pulse::Close).is_err());
    }

    #[rstest]
    #[case(0.0, 10.0)]
    #[case(-5.0, 10.0)]
    #[case(10.0, f64::NAN)]
    #[case(f64::INFINITY, 10.0)]
    #[case(1e20, 1e20)]
    #[case(10.0, MAX_TRAVERSE_SECS + 1.0)]
    fn validate_rejects_bad_traverse(#[case] open: f64, #[case] close: f64) {
        let cover = CoverConfig::new("a").with_traverse_secs(open, close);
        assert!(matches!(cover.validate(), Err(CoverError::InvalidConfig(_))));
    }

    #[test]
    fn validate_rejects_bad_timing() {
        let cover = CoverConfig::new("a").with_traverse_secs(MAX_TRAVERSE_SECS, 0.5);
        assert!(cover.validate().is_ok());

        let cover = CoverConfig::new("a").with_debounce_ms(MAX_INTERVAL_MS + 1);
        assert!(cover.validate().is_err());
        let cover = CoverConfig::new("a").with_debounce_ms(u64::MAX);
        assert!(cover.validate().is_err());

        let cover = CoverConfig::new("a").with_tick_interval_ms(0);
        assert!(cover.validate().is_err());

        let cover = CoverConfig::new("a").with_bump(100.0);
        assert!(cover.validate().is_err());

        assert!(CoverConfig::new("a").validate().is_ok());
        assert!(CoverConfig::default().validate().is_err());
    }

    #[test]
    fn parse_full_toml() {
        let text = r#"
            [transmitter]
            kind = "hass"
            base_url = "http://ha.local:8123"
            token = "secret"
            remote_entity_id = "remote.broadlink"

            [web]
            port = 9000

            [mqtt]
            enabled = true
            topic_prefix = "home/covers"

            [[covers]]
            name = "Living Room"
            open_time_secs = 20
            close_time_secs = 18.5
            initial_position = "40"

            [covers.commands]
            device = "living"
            open = "open"
            close = "close"
            stop = "stop"

            [[covers]]
            id = "bedroom"
            name = "Bedroom Shutter"
            bump = 1.0
        "#;

        let config = Config::from_toml_str(text).unwrap();
        assert_eq!(config.covers.len(), 2);

        let living = &config.covers[0];
        assert_eq!(living.id, "living_room");
        assert_eq!(living.open_time_secs, 20.0);
        assert_eq!(living.close_time_secs, 18.5);
        assert_eq!(
            living.initial_position,
            Some(PersistedPosition::Text("40".into()))
        );
        assert_eq!(living.commands, CommandKeys::for_device("living"));

        let bedroom = &config.covers[1];
        assert_eq!(bedroom.id, "bedroom");
        assert_eq!(bedroom.bump, 1.0);
        assert_eq!(bedroom.open_time_secs, 35.0);
        assert!(bedroom.commands.device.is_none());

        assert_eq!(config.web.port, 9000);
        assert!(config.web.enabled);
        assert!(config.mqtt.enabled);
        assert_eq!(
            config.mqtt.cover_topic("bedroom", "state"),
            "home/covers/bedroom/state"
        );
        assert!(matches!(
            config.transmitter,
            TransmitterConfig::Hass { ref remote_entity_id, .. } if remote_entity_id == "remote.broadlink"
        ));
    }

    #[test]
    fn mqtt_transmitter_defaults() {
        let text = r#"
            [transmitter]
            kind = "mqtt"
            host = "broker"
            topic = "rf/send"
        "#;
        let config = Config::from_toml_str(text).unwrap();
        assert_eq!(
            config.transmitter,
            TransmitterConfig::Mqtt {
                host: "broker".into(),
                port: 1883,
                client_id: "rf-cover-tx".into(),
                topic: "rf/send".into(),
            }
        );
    }

    #[test]
    fn duplicate_ids_rejected() {
        let text = r#"
            [[covers]]
            name = "Blind"
            [[covers]]
            name = "blind"
        "#;
        let err = Config::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = Config::from_toml_str("covers = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn empty_config_is_valid() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.covers.is_empty());
        assert_eq!(config.transmitter, TransmitterConfig::Log);
        assert!(!config.mqtt.enabled);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_cover(CoverConfig::new("One").with_debounce_ms(1000))
            .with_mqtt(MqttConfig::default().with_host("broker.local").with_port(8883))
            .with_web(WebConfig::default().with_enabled(false));

        assert_eq!(config.covers[0].debounce_ms, 1000);
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert!(!config.web.enabled);
    }
}
