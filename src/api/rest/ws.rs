use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::dispatch::Command;
use crate::engine::queue::submit;
use crate::models::events::ClientEvent;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (outbox_tx, mut outbox_rx) = mpsc::channel(state.outbox_buffer_size);

    state.notifier.attach(connection_id, outbox_tx);
    state.metrics.connected_clients.inc();
    info!(connection_id = %connection_id, "websocket client connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbox_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let event = match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => event,
                Err(err) => {
                    debug!(connection_id = %connection_id, error = %err, "malformed event dropped");
                    recv_state
                        .metrics
                        .events_dropped_total
                        .with_label_values(&["malformed"])
                        .inc();
                    continue;
                }
            };

            let command = Command::Event {
                connection_id,
                event,
            };
            if let Err(err) = submit(&recv_state, command).await {
                warn!(error = %err, "dispatcher unavailable; closing socket");
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.notifier.detach(connection_id);
    state.metrics.connected_clients.dec();
    if let Err(err) = submit(&state, Command::Disconnected { connection_id }).await {
        warn!(error = %err, "failed to report disconnect");
    }

    info!(connection_id = %connection_id, "websocket client disconnected");
}
