use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use dealerhub_core::sync::{ClientMessage, ServerMessage};
use futures::{SinkExt, StreamExt};

use crate::state::AppState;
use crate::ws::manager::WsManager;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by a sender task plus the receive loop.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager))
}

fn encode(message: &ServerMessage) -> Option<Message> {
    serde_json::to_string(message)
        .ok()
        .map(|text| Message::Text(text.into()))
}

/// Apply one inbound text frame and return the reply, if any.
async fn dispatch(ws_manager: &WsManager, conn_id: &str, text: &str) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { tables }) => {
            let current = ws_manager.subscribe(conn_id, &tables).await?;
            tracing::debug!(conn_id, ?tables, "WebSocket subscribed");
            Some(ServerMessage::Subscribed { tables: current })
        }
        Ok(ClientMessage::Unsubscribe { tables }) => {
            ws_manager.unsubscribe(conn_id, &tables).await;
            tracing::debug!(conn_id, ?tables, "WebSocket unsubscribed");
            None
        }
        Err(e) => Some(ServerMessage::Error {
            message: format!("Unrecognized message: {e}"),
        }),
    }
}

/// Manage a single WebSocket connection after upgrade.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut rx = ws_manager.add(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => {
                if let Some(reply) = dispatch(&ws_manager, &conn_id, text.as_str()).await {
                    if let Some(message) = encode(&reply) {
                        ws_manager.send_to(&conn_id, message).await;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
