//! Fan-out delivery of a signed record to relays
//!
//! Every relay gets its own task and its own timeout. Outcomes are collected in
//! input order, one per address, duplicates included. Nothing is retried and
//! nothing is rolled back: a relay that accepted the record keeps it no matter
//! what its siblings did.

use crate::Record;
use crate::error::{BroadcastError, RelayError};
use crate::validation::validate_record;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

/// Default per-relay deadline covering connect, send and acknowledgment
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Delivers one record to one relay
#[async_trait]
pub trait RelayConnector: Send + Sync {
    /// Publish `record` to `relay` and wait for its acknowledgment
    ///
    /// Returns the relay's acknowledgment message on acceptance.
    async fn publish(&self, relay: &str, record: &Record) -> Result<String, RelayError>;
}

/// Messages a relay sends back after a publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    /// `["OK", <event id>, <accepted>, <message>]`
    Ok {
        event_id: String,
        accepted: bool,
        message: String,
    },
    /// `["NOTICE", <message>]`
    Notice(String),
    /// Anything else (EVENT, EOSE, AUTH, ...), ignored while publishing
    Other(String),
}

impl RelayMessage {
    /// Parse a relay frame
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| RelayError::Protocol(format!("invalid JSON frame: {}", e)))?;
        let items = value
            .as_array()
            .ok_or_else(|| RelayError::Protocol("frame is not an array".to_string()))?;
        let label = items
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| RelayError::Protocol("frame has no label".to_string()))?;

        match label {
            "OK" => {
                let event_id = items
                    .get(1)
                    .and_then(Value::as_str)
                    .ok_or_else(|| RelayError::Protocol("OK without event id".to_string()))?;
                let accepted = items
                    .get(2)
                    .and_then(Value::as_bool)
                    .ok_or_else(|| RelayError::Protocol("OK without status".to_string()))?;
                let message = items.get(3).and_then(Value::as_str).unwrap_or_default();
                Ok(RelayMessage::Ok {
                    event_id: event_id.to_string(),
                    accepted,
                    message: message.to_string(),
                })
            }
            "NOTICE" => Ok(RelayMessage::Notice(
                items
                    .get(1)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            )),
            other => Ok(RelayMessage::Other(other.to_string())),
        }
    }
}

/// Websocket transport speaking the NIP-01 publish exchange
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_RELAY_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    async fn connect(&self, relay: &str) -> Result<WsStream, RelayError> {
        let url = Url::parse(relay).map_err(|e| RelayError::InvalidUrl(format!("{relay}: {e}")))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(RelayError::InvalidUrl(format!(
                "URL must use ws:// or wss:// scheme, got: {}",
                url.scheme()
            )));
        }

        match timeout(self.connect_timeout, connect_async(url.as_str())).await {
            Ok(Ok((stream, _))) => Ok(stream),
            Ok(Err(e)) => Err(RelayError::Connect(e.to_string())),
            Err(_) => Err(RelayError::Timeout(self.connect_timeout)),
        }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelayConnector for WebSocketConnector {
    async fn publish(&self, relay: &str, record: &Record) -> Result<String, RelayError> {
        let event_id = record
            .id
            .map(|id| id.to_hex())
            .ok_or_else(|| RelayError::Protocol("record has no id".to_string()))?;

        let mut ws = self.connect(relay).await?;
        debug!("Connected to relay: {}", relay);

        let frame = serde_json::to_string(&("EVENT", record))
            .map_err(|e| RelayError::Protocol(e.to_string()))?;

        let result = match ws.send(Message::Text(frame)).await {
            Ok(()) => await_ok(&mut ws, &event_id).await,
            Err(e) => Err(RelayError::Connect(e.to_string())),
        };

        // the outcome is already decided; a failed close changes nothing
        let _ = ws.close(None).await;
        result
    }
}

async fn await_ok(ws: &mut WsStream, event_id: &str) -> Result<String, RelayError> {
    while let Some(frame) = ws.next().await {
        let frame = frame.map_err(|e| RelayError::Protocol(e.to_string()))?;
        match frame {
            Message::Text(text) => match RelayMessage::parse(&text)? {
                RelayMessage::Ok {
                    event_id: acked,
                    accepted,
                    message,
                } if acked == event_id => {
                    return if accepted {
                        Ok(message)
                    } else {
                        Err(RelayError::Rejected(message))
                    };
                }
                RelayMessage::Notice(notice) => debug!("Relay notice: {}", notice),
                other => debug!("Ignoring relay message while publishing: {:?}", other),
            },
            Message::Close(_) => return Err(RelayError::Closed),
            _ => {}
        }
    }
    Err(RelayError::Closed)
}

/// Result of one delivery attempt
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    pub relay: String,
    /// Acknowledgment message on success
    pub result: Result<String, RelayError>,
    pub elapsed: Duration,
}

impl RelayOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// All outcomes of a broadcast, in the order relays were given
#[derive(Debug, Clone, Default)]
pub struct BroadcastReport {
    pub outcomes: Vec<RelayOutcome>,
}

impl BroadcastReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// Relays that accepted the record
    pub fn accepted_relays(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.relay.as_str())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RelayOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Publishes a signed record to many relays concurrently
#[derive(Clone)]
pub struct Broadcaster {
    connector: Arc<dyn RelayConnector>,
    relay_timeout: Duration,
}

impl Broadcaster {
    pub fn new(connector: Arc<dyn RelayConnector>) -> Self {
        Self {
            connector,
            relay_timeout: DEFAULT_RELAY_TIMEOUT,
        }
    }

    /// Deadline applied to each relay independently
    pub fn with_timeout(mut self, relay_timeout: Duration) -> Self {
        self.relay_timeout = relay_timeout;
        self
    }

    /// Deliver `record` to every relay
    ///
    /// Fails only when the record itself is not publishable; per-relay failures
    /// are reported in the returned [`BroadcastReport`].
    pub async fn broadcast(
        &self,
        record: Arc<Record>,
        relays: &[String],
    ) -> Result<BroadcastReport, BroadcastError> {
        validate_record(&record)?;

        let handles: Vec<_> = relays
            .iter()
            .map(|relay| {
                let connector = Arc::clone(&self.connector);
                let record = Arc::clone(&record);
                let relay = relay.clone();
                let relay_timeout = self.relay_timeout;
                tokio::spawn(async move {
                    let started = Instant::now();
                    let result = match timeout(relay_timeout, connector.publish(&relay, &record))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(RelayError::Timeout(relay_timeout)),
                    };
                    (result, started.elapsed())
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(relays.len());
        for (relay, handle) in relays.iter().zip(handles) {
            let (result, elapsed) = match handle.await {
                Ok(finished) => finished,
                Err(e) => (Err(RelayError::Task(e.to_string())), Duration::ZERO),
            };

            match &result {
                Ok(_) => info!("Published to relay: {} ({:?})", relay, elapsed),
                Err(e) => warn!("Failed to publish to relay {}: {}", relay, e),
            }

            outcomes.push(RelayOutcome {
                relay: relay.clone(),
                result,
                elapsed,
            });
        }

        Ok(BroadcastReport { outcomes })
    }
}
