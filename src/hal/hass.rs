//! Home Assistant transmitter: `remote.send_command` over the REST API.
//!
//! Learned IR/RF codes usually live on a Broadlink-style remote entity in
//! Home Assistant. Calling the service through the REST API blocks until
//! the remote has sent the code, which is the confirmation the controller
//! waits for.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;

use crate::error::DispatchError;
use crate::traits::CommandSink;

const SERVICE_PATH: &str = "/api/services/remote/send_command";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendCommandBody<'a> {
    entity_id: &'a str,
    device: &'a str,
    command: &'a str,
}

/// Sends pulses through a Home Assistant remote entity.
#[derive(Clone, Debug)]
pub struct HassTransmitter {
    client: Client,
    url: String,
    token: String,
    entity_id: String,
}

impl HassTransmitter {
    /// Transmitter for `remote_entity_id` on the instance at `base_url`.
    pub fn new(base_url: &str, token: &str, remote_entity_id: &str) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DispatchError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            url: service_url(base_url),
            token: token.to_string(),
            entity_id: remote_entity_id.to_string(),
        })
    }

    /// Full service URL requests are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn service_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), SERVICE_PATH)
}

fn status_error(status: StatusCode) -> Option<DispatchError> {
    if status.is_success() {
        None
    } else if status.is_client_error() {
        Some(DispatchError::Rejected(format!("home assistant returned {status}")))
    } else {
        Some(DispatchError::Unavailable(format!("home assistant returned {status}")))
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            DispatchError::Unavailable(err.to_string())
        } else {
            DispatchError::Transport(err.to_string())
        }
    }
}

impl CommandSink for HassTransmitter {
    async fn send_command(&self, device: &str, command: &str) -> Result<(), DispatchError> {
        let body = SendCommandBody {
            entity_id: &self.entity_id,
            device,
            command,
        };
        debug!(url = %self.url, entity = %self.entity_id, device, command, "calling remote.send_command");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        match status_error(response.status()) {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_joined_once() {
        assert_eq!(
            service_url("http://ha.local:8123/"),
            "http://ha.local:8123/api/services/remote/send_command"
        );
        assert_eq!(
            service_url("http://ha.local:8123"),
            "http://ha.local:8123/api/services/remote/send_command"
        );
    }

    #[test]
    fn status_mapping() {
        assert!(status_error(StatusCode::OK).is_none());
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED),
            Some(DispatchError::Rejected(_))
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY),
            Some(DispatchError::Unavailable(_))
        ));
    }

    #[test]
    fn body_shape() {
        let body = SendCommandBody {
            entity_id: "remote.broadlink",
            device: "office_blind",
            command: "open",
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["entity_id"], "remote.broadlink");
        assert_eq!(value["device"], "office_blind");
        assert_eq!(value["command"], "open");
    }
}
