//! MQTT transmitter: publish pulses for an RF bridge to pick up.
//!
//! Each pulse becomes a JSON message `{"device": ..., "command": ...}` on a
//! single topic. A dispatch is confirmed once the client has queued the
//! publish; delivery to the bridge is left to QoS 1.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::traits::CommandSink;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct PulseMessage<'a> {
    device: &'a str,
    command: &'a str,
}

/// Publishes pulses to an MQTT topic.
///
/// Owns a background task that drives the client's event loop; it is
/// aborted when the transmitter is dropped.
pub struct MqttTransmitter {
    client: AsyncClient,
    topic: String,
    driver: JoinHandle<()>,
}

impl MqttTransmitter {
    /// Connect to the broker and start the event loop.
    ///
    /// Must be called inside a tokio runtime.
    pub fn connect(host: &str, port: u16, client_id: &str, topic: &str) -> Self {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(30));
        let (client, mut eventloop) = AsyncClient::new(options, 16);

        let broker = format!("{host}:{port}");
        let driver = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        debug!(%broker, "transmitter connected");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(%broker, error = %e, "transmitter connection error");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        });

        Self {
            client,
            topic: topic.to_string(),
            driver,
        }
    }

    /// Topic pulses are published to.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for MqttTransmitter {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

fn encode(device: &str, command: &str) -> Result<Vec<u8>, DispatchError> {
    serde_json::to_vec(&PulseMessage { device, command })
        .map_err(|e| DispatchError::Rejected(e.to_string()))
}

impl CommandSink for MqttTransmitter {
    async fn send_command(&self, device: &str, command: &str) -> Result<(), DispatchError> {
        let payload = encode(device, command)?;
        debug!(topic = %self.topic, device, command, "publishing pulse");
        self.client
            .publish(self.topic.as_str(), QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))
    }
}
