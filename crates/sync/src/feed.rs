//! Realtime change feed from the API websocket.
//!
//! [`WsChangeFeed`] connects to `/api/v1/ws`, subscribes to a set of tables
//! and yields [`ChangeNotice`]s. When the connection drops it reconnects
//! with exponential backoff until cancelled.

use std::time::Duration;

use async_trait::async_trait;
use dealerhub_core::sync::{ChangeNotice, ClientMessage, ServerMessage};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::error::{SyncError, SyncResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A source of row change notices.
#[async_trait]
pub trait ChangeFeed: Send + 'static {
    /// Next notice, or `None` once the feed has ended for good.
    async fn next(&mut self) -> Option<ChangeNotice>;
}

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the second connection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay, clamped to `max_delay`.
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Extract a change notice from a server text frame.
pub fn parse_frame(text: &str) -> Option<ChangeNotice> {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(ServerMessage::Change(notice)) => Some(notice),
        Ok(ServerMessage::Subscribed { tables }) => {
            tracing::debug!(?tables, "Realtime subscription confirmed");
            None
        }
        Ok(ServerMessage::Error { message }) => {
            tracing::warn!(%message, "Realtime server reported an error");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unrecognised realtime frame");
            None
        }
    }
}

pub struct WsChangeFeed {
    url: String,
    tables: Vec<String>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
    stream: Option<WsStream>,
}

impl WsChangeFeed {
    /// Feed of changes on `tables`. An empty list subscribes to all tables.
    pub fn new(url: impl Into<String>, tables: Vec<String>, cancel: CancellationToken) -> Self {
        Self {
            url: url.into(),
            tables,
            reconnect: ReconnectConfig::default(),
            cancel,
            stream: None,
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    async fn connect(&self) -> SyncResult<WsStream> {
        let (mut stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| SyncError::WebSocket(format!("Failed to connect to {}: {e}", self.url)))?;

        let subscribe = ClientMessage::Subscribe {
            tables: self.tables.clone(),
        };
        let frame = serde_json::to_string(&subscribe).map_err(|e| SyncError::Decode(e.to_string()))?;
        stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| SyncError::WebSocket(e.to_string()))?;

        tracing::info!(url = %self.url, tables = ?self.tables, "Realtime feed connected");
        Ok(stream)
    }

    /// Connect with exponential backoff. `None` when cancelled first.
    async fn connect_with_backoff(&self) -> Option<WsStream> {
        let mut delay = self.reconnect.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                result = self.connect() => match result {
                    Ok(stream) => return Some(stream),
                    Err(e) => {
                        tracing::warn!(
                            url = %self.url,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Realtime connect failed",
                        );
                    }
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = next_delay(delay, &self.reconnect);
        }
    }
}

#[async_trait]
impl ChangeFeed for WsChangeFeed {
    async fn next(&mut self) -> Option<ChangeNotice> {
        loop {
            if self.stream.is_none() {
                self.stream = Some(self.connect_with_backoff().await?);
            }
            let cancel = self.cancel.clone();
            let stream = self.stream.as_mut()?;

            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                frame = stream.next() => frame,
            };

            match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(notice) = parse_frame(&text) {
                        return Some(notice);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!(url = %self.url, "Realtime feed closed by server");
                    self.stream = None;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(url = %self.url, error = %e, "Realtime feed error");
                    self.stream = None;
                }
            }
        }
    }
}
