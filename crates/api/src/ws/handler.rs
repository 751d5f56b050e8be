use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use reelgen_core::types::DbId;

use crate::middleware::auth::WsUser;
use crate::state::AppState;

/// Interval between heartbeat pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// Authentication happens before the upgrade; an invalid or missing token
/// is rejected with 401 and no socket is opened.
pub async fn ws_handler(
    WsUser(user): WsUser,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user.user_id))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Subscribes to the owner's progress events.
///   2. Spawns a sender task that forwards events and sends heartbeat pings.
///   3. Processes inbound frames on the current task.
///   4. Unsubscribes on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, owner_id: DbId) {
    let mut subscription = state.notifier.subscribe(owner_id).await;
    let subscription_id = subscription.id;
    tracing::info!(owner_id, subscription_id = %subscription_id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        // The first tick completes immediately.
        heartbeat.tick().await;

        loop {
            let msg = tokio::select! {
                event = subscription.recv() => match event {
                    Some(event) => Message::Text(event.to_json().into()),
                    // Notifier shut down.
                    None => break,
                },
                _ = heartbeat.tick() => Message::Ping(Bytes::new()),
            };

            if sink.send(msg).await.is_err() {
                tracing::debug!(subscription_id = %subscription_id, "WebSocket sink closed");
                break;
            }
        }

        let _ = sink.send(Message::Close(None)).await;
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(subscription_id = %subscription_id, "Pong received");
            }
            // Clients only listen on this socket.
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(subscription_id = %subscription_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.notifier.unsubscribe(owner_id, subscription_id).await;
    send_task.abort();
    tracing::info!(owner_id, subscription_id = %subscription_id, "WebSocket disconnected");
}
