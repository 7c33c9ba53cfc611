// ============================
// taskchat-backend-lib/src/ws_router.rs
// ============================
//! WebSocket router and connection handling.
//!
//! One task per connection reads inbound frames and dispatches them in
//! arrival order; a second task drains the connection's outbound channel to
//! the socket. On close the connection is removed from the gateway, which
//! also clears its room memberships.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use tokio::sync::mpsc;

use taskchat_common::{ClientToServer, ServerToClient};

use crate::error::AppError;
use crate::metrics as keys;
use crate::rooms::ConnectionId;
use crate::store::RecordStore;
use crate::validation;
use crate::AppState;

/// Size of the per-connection outbound event buffer.
const OUTBOUND_BUFFER: usize = 32;

/// Create the WebSocket router
pub fn create_router<S: RecordStore + Clone + Send + Sync + 'static>(
    state: Arc<AppState<S>>,
) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Handler for WebSocket connections
pub async fn ws_handler<S: RecordStore + Clone + Send + Sync + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    counter!(keys::WS_CONNECTIONS).increment(1);
    gauge!(keys::WS_ACTIVE).increment(1.0);

    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection<S: RecordStore + Clone + Send + Sync + 'static>(
    socket: WebSocket,
    state: Arc<AppState<S>>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // channel the gateway sends through for this connection
    let (conn_tx, mut conn_rx) = mpsc::channel::<ServerToClient>(OUTBOUND_BUFFER);
    let conn = state.gateway.register(conn_tx);
    tracing::debug!(%conn, "client connected");

    // Forward server events to the socket
    let send_task = tokio::spawn(async move {
        while let Some(event) = conn_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::error!(error = %err, "failed to serialize outbound event");
                    continue;
                },
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Process incoming frames one at a time, in arrival order
    while let Some(Ok(frame)) = ws_rx.next().await {
        match frame {
            Message::Text(text) => match serde_json::from_str::<ClientToServer>(&text) {
                Ok(event) => {
                    if let Err(err) = dispatch_event(conn, event, &state).await {
                        tracing::warn!(%conn, error = %err, "event handling failed");
                        let reply = ServerToClient::Error {
                            code: err.error_code().to_string(),
                            message: err.to_string(),
                        };
                        state.gateway.send(conn, reply);
                    }
                },
                Err(err) => {
                    let reply = ServerToClient::MalformedMessage {
                        err_msg: err.to_string(),
                    };
                    state.gateway.send(conn, reply);
                },
            },
            Message::Close(_) => break,
            _ => {},
        }
    }

    // Cleanup: release the handle and leave every joined room
    state.gateway.disconnect(conn);
    tracing::debug!(%conn, "client disconnected");

    counter!(keys::WS_DISCONNECTIONS).increment(1);
    gauge!(keys::WS_ACTIVE).decrement(1.0);

    send_task.abort();
}

async fn dispatch_event<S: RecordStore + Clone + Send + Sync + 'static>(
    conn: ConnectionId,
    event: ClientToServer,
    state: &AppState<S>,
) -> Result<(), AppError> {
    match event {
        ClientToServer::JoinConversation { conversation_id } => {
            let conversation_id = validation::validate_conversation_id(&conversation_id)?;
            state.gateway.join(conn, conversation_id);
            counter!(keys::ROOM_JOINS).increment(1);
            tracing::debug!(%conn, %conversation_id, "joined conversation");
            Ok(())
        },
        ClientToServer::LeaveConversation { conversation_id } => {
            state.gateway.leave(conn, &conversation_id);
            tracing::debug!(%conn, %conversation_id, "left conversation");
            Ok(())
        },
        ClientToServer::SendMessage {
            conversation_id,
            sender,
            text,
        } => {
            state
                .fanout
                .handle_send(conn, &conversation_id, &sender, &text)
                .await?;
            Ok(())
        },
    }
}
