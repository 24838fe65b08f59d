//! Slack Socket Mode: receive events over a websocket instead of webhooks.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::slack::{SlackClient, respond_to_mention};
use super::slack_events::{AppMention, SlackEvent, SlackPayload};
use crate::error::ChannelError;
use crate::state::AppState;

/// Wait before reconnecting after a dropped or refused connection.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// One Socket Mode frame.
#[derive(Debug, Deserialize)]
pub struct SocketEnvelope {
    #[serde(default)]
    pub envelope_id: Option<String>,
    #[serde(rename = "type")]
    pub envelope_type: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub retry_attempt: u32,
}

/// What to do with an envelope once it has been acknowledged.
#[derive(Debug, PartialEq, Eq)]
pub enum EnvelopeAction {
    Answer(AppMention),
    Reconnect,
    Ignore,
}

impl SocketEnvelope {
    pub fn action(&self) -> EnvelopeAction {
        match self.envelope_type.as_str() {
            "disconnect" => EnvelopeAction::Reconnect,
            "events_api" if self.retry_attempt > 0 => {
                debug!(retry = self.retry_attempt, "Skipping redelivered event");
                EnvelopeAction::Ignore
            }
            "events_api" => {
                let Some(payload) = self.payload.clone() else {
                    return EnvelopeAction::Ignore;
                };
                match serde_json::from_value::<SlackPayload>(payload) {
                    Ok(SlackPayload::EventCallback {
                        event: SlackEvent::AppMention(mention),
                        ..
                    }) => EnvelopeAction::Answer(mention),
                    Ok(_) => EnvelopeAction::Ignore,
                    Err(e) => {
                        warn!(error = %e, "Unparseable events_api payload");
                        EnvelopeAction::Ignore
                    }
                }
            }
            _ => EnvelopeAction::Ignore,
        }
    }
}

/// Keep a Socket Mode connection open for the life of the process.
pub async fn run(state: Arc<AppState>, slack: Arc<SlackClient>) {
    loop {
        match run_connection(&state, &slack).await {
            Ok(()) => info!("Socket Mode connection closed, reconnecting"),
            Err(e) => warn!(error = %e, "Socket Mode connection failed"),
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn run_connection(state: &Arc<AppState>, slack: &SlackClient) -> Result<(), ChannelError> {
    let url = slack.open_socket_url().await?;
    let (stream, _) = connect_async(url.as_str())
        .await
        .map_err(|e| ChannelError::StartupFailed {
            name: "slack".to_string(),
            reason: format!("websocket connect failed: {e}"),
        })?;
    info!("Socket Mode connected");
    let (mut write, mut read) = stream.split();

    while let Some(frame) = read.next().await {
        let frame = frame.map_err(|e| ChannelError::Disconnected {
            name: "slack".to_string(),
            reason: e.to_string(),
        })?;
        let text = match frame {
            Message::Text(text) => text,
            Message::Ping(data) => {
                let _ = write.send(Message::Pong(data)).await;
                continue;
            }
            Message::Close(_) => break,
            _ => continue,
        };

        let envelope: SocketEnvelope = match serde_json::from_str(text.as_str()) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Unparseable Socket Mode frame");
                continue;
            }
        };

        if let Some(id) = &envelope.envelope_id {
            let ack = json!({ "envelope_id": id }).to_string();
            write
                .send(Message::Text(ack.into()))
                .await
                .map_err(|e| ChannelError::SendFailed {
                    name: "slack".to_string(),
                    reason: format!("ack failed: {e}"),
                })?;
        }

        match envelope.action() {
            EnvelopeAction::Answer(mention) => {
                let state = Arc::clone(state);
                tokio::spawn(async move {
                    respond_to_mention(&state, mention).await;
                });
            }
            EnvelopeAction::Reconnect => {
                info!("Slack asked us to reconnect");
                break;
            }
            EnvelopeAction::Ignore => {
                debug!(envelope_type = %envelope.envelope_type, "Ignoring envelope");
            }
        }
    }
    Ok(())
}
