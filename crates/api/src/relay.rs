//! Forwards row changes from the [`EventBus`] to subscribed WebSocket clients.

use std::sync::Arc;

use dealerhub_core::sync::ChangeNotice;
use dealerhub_events::EventBus;
use tokio::sync::broadcast;

use crate::ws::WsManager;

/// Background service relaying change notices to WebSocket connections.
pub struct ChangeRelay {
    ws_manager: Arc<WsManager>,
}

impl ChangeRelay {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Subscribe to `bus` and spawn [`run`](Self::run).
    pub fn spawn(self, bus: &EventBus) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(bus.subscribe()))
    }

    /// Run until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<ChangeNotice>) {
        loop {
            match receiver.recv().await {
                Ok(notice) => {
                    let delivered = self.ws_manager.publish_change(&notice).await;
                    tracing::debug!(
                        table = %notice.table,
                        action = notice.action.as_str(),
                        delivered,
                        "Change relayed"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Change relay lagged, some notices were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, change relay shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealerhub_core::sync::ChangeAction;

    #[tokio::test]
    async fn relay_forwards_and_stops_when_bus_drops() {
        let bus = EventBus::default();
        let manager = Arc::new(WsManager::new());
        let mut rx = manager.add("a".to_string()).await;
        manager.subscribe("a", &[]).await;

        let handle = ChangeRelay::new(Arc::clone(&manager)).spawn(&bus);
        bus.publish(ChangeNotice {
            table: "hull_colors".to_string(),
            action: ChangeAction::Delete,
            record_id: Some("3".to_string()),
            dealer_id: None,
            timestamp: 5,
        });

        assert!(rx.recv().await.is_some());
        drop(bus);
        handle.await.unwrap();
    }
}
