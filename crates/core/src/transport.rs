use crate::messages::CandidateMessage;
use async_trait::async_trait;
use secrecy::SecretString;
use std::time::Duration;
use tokio::sync::broadcast;

/// Events a room implementation fans out to subscribers.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    ParticipantConnected { identity: String },
    DataReceived { payload: Vec<u8> },
    TrackSubscribed { kind: String, participant: String },
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to room: {0}")]
    Connect(String),
    #[error("failed to publish data: {0}")]
    Publish(String),
    #[error("not connected to a room")]
    NotConnected,
}

/// Contract for the external real-time room service. The controller only
/// consumes this surface; the real implementation belongs to the media
/// platform's SDK. Keeping it behind a trait lets tests and local runs
/// inject a scripted room instead.
#[async_trait]
pub trait RoomTransport: Send {
    async fn connect(&mut self, url: &str, token: &SecretString) -> Result<(), TransportError>;

    async fn set_microphone_enabled(&mut self, enabled: bool) -> Result<(), TransportError>;

    async fn set_camera_enabled(&mut self, enabled: bool) -> Result<(), TransportError>;

    async fn publish_data(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Subscribes to room events. Only events emitted after the call are
    /// delivered to the returned receiver.
    fn subscribe(&self) -> broadcast::Receiver<RoomEvent>;

    async fn disconnect(&mut self);
}

/// In-process stand-in for the real room service. Every published question
/// payload is answered with a scripted candidate response after a fixed
/// think delay, which is enough to exercise the full interview loop
/// without a live media server.
pub struct SimulatedRoom {
    connected: bool,
    think_delay: Duration,
    events: broadcast::Sender<RoomEvent>,
}

impl SimulatedRoom {
    pub fn new(think_delay: Duration) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            connected: false,
            think_delay,
            events,
        }
    }
}

#[async_trait]
impl RoomTransport for SimulatedRoom {
    async fn connect(&mut self, url: &str, _token: &SecretString) -> Result<(), TransportError> {
        tracing::debug!(url, "simulated room connected");
        self.connected = true;
        let _ = self.events.send(RoomEvent::ParticipantConnected {
            identity: "candidate".to_string(),
        });
        Ok(())
    }

    async fn set_microphone_enabled(&mut self, _enabled: bool) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        Ok(())
    }

    async fn set_camera_enabled(&mut self, _enabled: bool) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        Ok(())
    }

    async fn publish_data(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let question = serde_json::from_slice::<serde_json::Value>(payload)
            .ok()
            .filter(|v| v["type"] == "question")
            .and_then(|v| v["question"].as_str().map(str::to_string));

        if let Some(question) = question {
            let events = self.events.clone();
            let delay = self.think_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let reply = serde_json::json!({
                    "type": "response",
                    "text": format!("Mock response to: {question}"),
                });
                let _ = events.send(RoomEvent::DataReceived {
                    payload: reply.to_string().into_bytes(),
                });
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }
}

/// Drains `events` until a candidate response arrives or `limit` elapses.
/// Non-response payloads and lagged receivers are skipped.
pub async fn wait_for_response(
    events: &mut broadcast::Receiver<RoomEvent>,
    limit: Duration,
) -> Option<String> {
    let next_response = async {
        loop {
            match events.recv().await {
                Ok(RoomEvent::DataReceived { payload }) => {
                    if let Some(CandidateMessage::Response { text }) =
                        CandidateMessage::decode(&payload)
                    {
                        return Some(text);
                    }
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "room event receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    };
    tokio::time::timeout(limit, next_response).await.ok().flatten()
}
