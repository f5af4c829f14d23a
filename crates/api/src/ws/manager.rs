use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use dealerhub_core::sync::{ChangeNotice, ServerMessage};
use dealerhub_core::types::Timestamp;
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// Tables this connection receives changes for. Empty means none yet;
    /// a subscribe with an empty list subscribes to everything.
    pub tables: HashSet<String>,
    pub all_tables: bool,
    pub connected_at: Timestamp,
}

impl WsConnection {
    fn wants(&self, table: &str) -> bool {
        self.all_tables || self.tables.contains(table)
    }
}

/// Manages all active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; wrapped in `Arc` and shared across
/// the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            sender: tx,
            tables: HashSet::new(),
            all_tables: false,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Add table subscriptions. An empty list subscribes to every table.
    ///
    /// Returns the connection's resulting table list (`[]` for all tables),
    /// or `None` if the connection is unknown.
    pub async fn subscribe(&self, conn_id: &str, tables: &[String]) -> Option<Vec<String>> {
        let mut conns = self.connections.write().await;
        let conn = conns.get_mut(conn_id)?;
        if tables.is_empty() {
            conn.all_tables = true;
            conn.tables.clear();
        } else if !conn.all_tables {
            conn.tables.extend(tables.iter().cloned());
        }
        let mut current: Vec<String> = conn.tables.iter().cloned().collect();
        current.sort();
        Some(current)
    }

    /// Remove table subscriptions. An empty list removes all of them.
    pub async fn unsubscribe(&self, conn_id: &str, tables: &[String]) {
        let mut conns = self.connections.write().await;
        if let Some(conn) = conns.get_mut(conn_id) {
            if tables.is_empty() {
                conn.all_tables = false;
                conn.tables.clear();
            } else {
                for table in tables {
                    conn.tables.remove(table);
                }
            }
        }
    }

    /// Send a message to a single connection.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        let conns = self.connections.read().await;
        match conns.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Push a change notice to every connection subscribed to its table.
    ///
    /// Returns the number of connections the notice was queued for.
    pub async fn publish_change(&self, notice: &ChangeNotice) -> usize {
        let text = match serde_json::to_string(&ServerMessage::Change(notice.clone())) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize change notice");
                return 0;
            }
        };
        let message = Message::Text(text.into());

        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values().filter(|c| c.wants(&notice.table)) {
            if conn.sender.send(message.clone()).is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealerhub_core::sync::ChangeAction;

    fn notice(table: &str) -> ChangeNotice {
        ChangeNotice {
            table: table.to_string(),
            action: ChangeAction::Update,
            record_id: Some("4".to_string()),
            dealer_id: Some("2".to_string()),
            timestamp: 1,
        }
    }

    fn text(message: Message) -> String {
        match message {
            Message::Text(text) => text.as_str().to_string(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn change_reaches_only_subscribed_connections() {
        let manager = WsManager::new();
        let mut pricing_rx = manager.add("a".to_string()).await;
        let mut catalog_rx = manager.add("b".to_string()).await;

        manager
            .subscribe("a", &["dealer_pricing".to_string()])
            .await
            .unwrap();
        manager
            .subscribe("b", &["boat_models".to_string()])
            .await
            .unwrap();

        assert_eq!(manager.publish_change(&notice("dealer_pricing")).await, 1);

        let frame = text(pricing_rx.recv().await.unwrap());
        let received: ServerMessage = serde_json::from_str(&frame).unwrap();
        assert_eq!(received, ServerMessage::Change(notice("dealer_pricing")));
        assert!(catalog_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_subscribe_means_all_tables() {
        let manager = WsManager::new();
        let mut rx = manager.add("a".to_string()).await;

        assert_eq!(manager.subscribe("a", &[]).await, Some(vec![]));
        assert_eq!(manager.publish_change(&notice("orders")).await, 1);
        assert!(rx.recv().await.is_some());

        manager.unsubscribe("a", &[]).await;
        assert_eq!(manager.publish_change(&notice("orders")).await, 0);
    }

    #[tokio::test]
    async fn unsubscribed_connection_gets_nothing() {
        let manager = WsManager::new();
        let _rx = manager.add("a".to_string()).await;
        assert_eq!(manager.publish_change(&notice("dealers")).await, 0);
        assert_eq!(manager.subscribe("missing", &[]).await, None);
    }

    #[tokio::test]
    async fn shutdown_clears_connections() {
        let manager = WsManager::new();
        let mut rx = manager.add("a".to_string()).await;
        manager.shutdown_all().await;

        assert_eq!(manager.connection_count().await, 0);
        assert!(matches!(rx.recv().await, Some(Message::Close(None))));
    }
}
