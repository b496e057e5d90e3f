//! MQTT bridge between a broker and the registered covers.
//!
//! For a cover with id `office` and the default prefix `cover`:
//!
//! **Subscribe Topics:**
//! - `cover/office/set` - `OPEN`, `CLOSE` or `STOP` (any case)
//! - `cover/office/position/set` - `40` or `{"position": 40}` (debounced)
//!
//! **Publish Topics (retained):**
//! - `cover/office/state` - `open`, `opening`, `closed` or `closing`
//! - `cover/office/position` - whole percent
//! - `cover/office/attributes` - full state JSON
//!
//! State is published whenever a cover's snapshot changes, and again for
//! every cover on each heartbeat.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, ClientError, Event, MqttOptions, Packet, QoS};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::commands::CoverCommand;
use crate::config::MqttConfig;
use crate::cover::Cover;
use crate::parsing::{parse_command, parse_position};
use crate::state::CoverSnapshot;
use crate::traits::CommandSink;

use super::api::CoverStateResponse;
use super::registry::CoverRegistry;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// MQTT-related errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// Failed to subscribe to a topic
    #[error("subscribe failed: {0}")]
    Subscribe(String),
    /// Failed to publish a message
    #[error("publish failed: {0}")]
    Publish(String),
}

// ============================================================================
// Topics
// ============================================================================

/// Which command topic a message arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTopic {
    /// `{prefix}/{id}/set`
    Set,
    /// `{prefix}/{id}/position/set`
    PositionSet,
}

/// Split a command topic into cover id and kind.
pub fn parse_command_topic<'a>(prefix: &str, topic: &'a str) -> Option<(&'a str, CommandTopic)> {
    let rest = topic.strip_prefix(prefix)?.strip_prefix('/')?;
    let (id, kind) = if let Some(id) = rest.strip_suffix("/position/set") {
        (id, CommandTopic::PositionSet)
    } else {
        (rest.strip_suffix("/set")?, CommandTopic::Set)
    };
    (!id.is_empty() && !id.contains('/')).then_some((id, kind))
}

/// Turn a payload into a command for the given topic kind.
pub fn command_for(kind: CommandTopic, payload: &[u8]) -> Option<CoverCommand> {
    let text = std::str::from_utf8(payload).ok()?;
    match kind {
        CommandTopic::Set => parse_command(text),
        CommandTopic::PositionSet => parse_position(text).map(CoverCommand::SetPosition),
    }
}

// ============================================================================
// Publishing
// ============================================================================

async fn publish_snapshot(
    client: &AsyncClient,
    config: &MqttConfig,
    id: &str,
    name: &str,
    snapshot: &CoverSnapshot,
) -> Result<(), ClientError> {
    let attributes =
        serde_json::to_vec(&CoverStateResponse::new(id, name, snapshot)).unwrap_or_default();
    let messages = [
        ("state", snapshot.state_str().as_bytes().to_vec()),
        ("position", snapshot.position.to_string().into_bytes()),
        ("attributes", attributes),
    ];
    for (suffix, payload) in messages {
        client
            .publish(config.cover_topic(id, suffix), QoS::AtLeastOnce, true, payload)
            .await?;
    }
    Ok(())
}

async fn watch_cover<S: CommandSink>(client: AsyncClient, config: MqttConfig, cover: Arc<Cover<S>>) {
    let mut rx = cover.controller().subscribe();
    loop {
        let snapshot = rx.borrow_and_update().clone();
        if let Err(e) = publish_snapshot(&client, &config, cover.id(), cover.name(), &snapshot).await {
            warn!(cover = cover.id(), error = %e, "state publish failed");
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
}

// ============================================================================
// MQTT Bridge
// ============================================================================

/// Bridges MQTT command topics to a [`CoverRegistry`] and publishes state.
pub struct MqttBridge<S: CommandSink> {
    registry: Arc<CoverRegistry<S>>,
    config: MqttConfig,
}

impl<S: CommandSink> MqttBridge<S> {
    /// Create a bridge for every cover in `registry`.
    pub fn new(registry: Arc<CoverRegistry<S>>, config: MqttConfig) -> Self {
        Self { registry, config }
    }

    /// Topics the bridge subscribes to.
    pub fn command_topics(&self) -> Vec<String> {
        self.registry
            .iter()
            .flat_map(|cover| {
                [
                    self.config.cover_topic(cover.id(), "set"),
                    self.config.cover_topic(cover.id(), "position/set"),
                ]
            })
            .collect()
    }

    /// Run the bridge.
    ///
    /// Handles messages until the task is dropped. Connection errors are
    /// logged and retried.
    pub async fn run(self) -> Result<(), MqttError> {
        let mut options =
            MqttOptions::new(&self.config.client_id, &self.config.host, self.config.port);
        options.set_keep_alive(Duration::from_secs(u64::from(self.config.keep_alive_secs)));

        let (client, mut eventloop) = AsyncClient::new(options, 32);

        let topics = self.command_topics();
        for topic in &topics {
            client
                .subscribe(topic, QoS::AtLeastOnce)
                .await
                .map_err(|e| MqttError::Subscribe(e.to_string()))?;
        }
        info!(
            broker = %format!("{}:{}", self.config.host, self.config.port),
            topics = topics.len(),
            "MQTT bridge subscribed"
        );

        for cover in self.registry.iter() {
            tokio::spawn(watch_cover(client.clone(), self.config.clone(), Arc::clone(cover)));
        }

        let heartbeat_client = client.clone();
        let heartbeat_config = self.config.clone();
        let heartbeat_registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let period = Duration::from_millis(heartbeat_config.heartbeat_ms.max(1));
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                for cover in heartbeat_registry.iter() {
                    let snapshot = cover.snapshot();
                    let published = publish_snapshot(
                        &heartbeat_client,
                        &heartbeat_config,
                        cover.id(),
                        cover.name(),
                        &snapshot,
                    )
                    .await;
                    if let Err(e) = published {
                        warn!(cover = cover.id(), error = %e, "heartbeat publish failed");
                    }
                }
            }
        });

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.handle_message(&publish.topic, &publish.payload);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "MQTT connection error");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    fn handle_message(&self, topic: &str, payload: &[u8]) {
        let Some((id, kind)) = parse_command_topic(&self.config.topic_prefix, topic) else {
            return;
        };
        let Some(command) = command_for(kind, payload) else {
            warn!(topic, payload = %String::from_utf8_lossy(payload), "unrecognised MQTT payload");
            return;
        };
        let cover = match self.registry.get(id) {
            Ok(cover) => Arc::clone(cover),
            Err(e) => {
                debug!(topic, error = %e, "MQTT message for unknown cover");
                return;
            }
        };

        // Commands can wait on a pulse; the event loop must keep polling.
        tokio::spawn(async move {
            if let Err(e) = cover.apply(command).await {
                warn!(cover = cover.id(), %command, error = %e, "MQTT command failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommandKeys, CoverConfig};
    use crate::hal::MockTransmitter;

    #[test]
    fn command_topics_are_split() {
        assert_eq!(
            parse_command_topic("cover", "cover/office/set"),
            Some(("office", CommandTopic::Set))
        );
        assert_eq!(
            parse_command_topic("cover", "cover/office/position/set"),
            Some(("office", CommandTopic::PositionSet))
        );
        assert_eq!(parse_command_topic("cover", "cover/office/state"), None);
        assert_eq!(parse_command_topic("cover", "blinds/office/set"), None);
        assert_eq!(parse_command_topic("cover", "cover//set"), None);
        assert_eq!(parse_command_topic("cover", "cover/a/b/set"), None);
    }

    #[test]
    fn payloads_become_commands() {
        assert_eq!(command_for(CommandTopic::Set, b"OPEN"), Some(CoverCommand::Open));
        assert_eq!(command_for(CommandTopic::Set, b"stop"), Some(CoverCommand::Stop));
        assert_eq!(
            command_for(CommandTopic::PositionSet, br#"{"position": 35}"#),
            Some(CoverCommand::SetPosition(35))
        );
        assert_eq!(command_for(CommandTopic::PositionSet, b"150"), None);
        assert_eq!(command_for(CommandTopic::Set, &[0xff, 0xfe]), None);
    }

    #[test]
    fn subscribes_per_cover() {
        let configs = [
            CoverConfig::new("Office").with_commands(CommandKeys::for_device("office")),
        ];
        let registry = CoverRegistry::from_configs(&configs, MockTransmitter::new()).unwrap();
        let bridge = MqttBridge::new(Arc::new(registry), MqttConfig::default());
        assert_eq!(
            bridge.command_topics(),
            vec!["cover/office/set", "cover/office/position/set"]
        );
    }
}
