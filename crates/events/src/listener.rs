//! Postgres `LISTEN` loop feeding the [`EventBus`].
//!
//! Every table carries a `notify_table_change()` trigger that publishes a
//! JSON payload on [`CHANGE_CHANNEL`]. [`ChangeFeedListener`] decodes those
//! payloads into [`ChangeNotice`]s and republishes them in-process. When
//! the listener connection drops it reconnects after a short delay; notices
//! sent while disconnected are lost, and clients recover through their
//! heartbeat refresh.

use std::sync::Arc;
use std::time::Duration;

use dealerhub_core::sync::{ChangeNotice, CHANGE_CHANNEL};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::bus::EventBus;

/// Delay before re-establishing a failed listener connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Decode a trigger payload. Malformed payloads yield `None`.
pub fn parse_notification(payload: &str) -> Option<ChangeNotice> {
    match serde_json::from_str::<ChangeNotice>(payload) {
        Ok(notice) => Some(notice),
        Err(e) => {
            tracing::warn!(error = %e, payload, "Ignoring malformed change notification");
            None
        }
    }
}

/// Background service relaying database change notifications to the bus.
pub struct ChangeFeedListener {
    pool: PgPool,
    bus: Arc<EventBus>,
}

impl ChangeFeedListener {
    pub fn new(pool: PgPool, bus: Arc<EventBus>) -> Self {
        Self { pool, bus }
    }

    /// Run until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(channel = CHANGE_CHANNEL, "Change feed listener started");
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.listen(&cancel) => result,
            };
            match result {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Change feed connection lost, reconnecting");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }
        tracing::info!("Change feed listener stopped");
    }

    /// Hold one listener connection open. Returns `Ok` only on cancellation.
    async fn listen(&self, cancel: &CancellationToken) -> Result<(), sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                notification = listener.recv() => {
                    let notification = notification?;
                    if let Some(notice) = parse_notification(notification.payload()) {
                        tracing::debug!(
                            table = %notice.table,
                            action = notice.action.as_str(),
                            "Change notification received"
                        );
                        self.bus.publish(notice);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealerhub_core::sync::ChangeAction;

    #[test]
    fn parses_trigger_payload() {
        let payload = r#"{"table":"dealer_pricing","action":"DELETE","record_id":"3","dealer_id":null,"timestamp":1700000000000}"#;
        let notice = parse_notification(payload).unwrap();
        assert_eq!(notice.action, ChangeAction::Delete);
        assert_eq!(notice.record_id.as_deref(), Some("3"));
        assert!(notice.dealer_id.is_none());
    }

    #[test]
    fn malformed_payload_is_dropped() {
        assert!(parse_notification("{not json").is_none());
        assert!(parse_notification(r#"{"table":"x","action":"TRUNCATE","timestamp":1}"#).is_none());
    }
}
