//! WebSocket upgrade handler for live session updates.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Validate the tenant id
//! 2. Upgrade to WebSocket
//! 3. Subscribe to the tenant's room
//! 4. Forward events and answer client requests until disconnect
//! 5. Unsubscribe

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};

use crate::application::SessionOrchestrator;
use crate::domain::foundation::{TenantId, Timestamp};

use super::{
    messages::{ClientMessage, ConnectedMessage, ServerMessage},
    rooms::{ClientId, RoomManager},
};

/// Replies to a single client (pong, status) waiting to be written.
const DIRECT_REPLY_BUFFER: usize = 8;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    /// Room manager for tenant-based routing.
    pub room_manager: Arc<RoomManager>,
    /// Answers `request.status`.
    pub orchestrator: Arc<SessionOrchestrator>,
}

impl WebSocketState {
    pub fn new(room_manager: Arc<RoomManager>, orchestrator: Arc<SessionOrchestrator>) -> Self {
        Self {
            room_manager,
            orchestrator,
        }
    }
}

/// Handle WebSocket upgrade requests for a tenant's live feed.
///
/// Route: `GET /api/sessions/:tenant_id/live`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(tenant_id): Path<String>,
    State(state): State<WebSocketState>,
) -> Response {
    let tenant_id = match TenantId::new(tenant_id) {
        Ok(id) => id,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, tenant_id, state))
}

/// Handle an established WebSocket connection.
///
/// Runs for the lifetime of the connection:
/// - Subscribing to the tenant's room
/// - Forwarding room events to the client
/// - Answering pings and status requests
/// - Unsubscribing on disconnect
async fn handle_socket(socket: WebSocket, tenant_id: TenantId, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();
    let client_id = ClientId::new();

    let mut room_rx = state
        .room_manager
        .subscribe(&tenant_id, client_id.clone())
        .await;

    let connected = ServerMessage::Connected(ConnectedMessage {
        tenant_id: tenant_id.to_string(),
        client_id: client_id.to_string(),
        timestamp: Timestamp::now().to_rfc3339(),
    });
    if let Err(e) = send_message(&mut sender, &connected).await {
        tracing::debug!(client_id = %client_id, "Failed to send connected message: {}", e);
        state.room_manager.unsubscribe(&client_id).await;
        return;
    }
    tracing::debug!(tenant_id = %tenant_id, client_id = %client_id, "Live client joined");

    let (direct_tx, mut direct_rx) = mpsc::channel::<ServerMessage>(DIRECT_REPLY_BUFFER);

    // Forward room events and direct replies to the client
    let mut send_task = {
        let client_id = client_id.clone();
        tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    event = room_rx.recv() => match event {
                        Ok(event) => event.to_server_message(),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(client_id = %client_id, skipped, "Live client lagging, events dropped");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    reply = direct_rx.recv() => match reply {
                        Some(reply) => reply,
                        None => break,
                    },
                };
                if let Err(e) = send_message(&mut sender, &msg).await {
                    tracing::debug!(client_id = %client_id, "Send error, closing connection: {}", e);
                    break;
                }
            }
        })
    };

    // Handle incoming messages from the client
    let mut recv_task = {
        let client_id = client_id.clone();
        let tenant_id = tenant_id.clone();
        let orchestrator = Arc::clone(&state.orchestrator);
        tokio::spawn(async move {
            while let Some(result) = receiver.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Ping) => ServerMessage::pong(),
                            Ok(ClientMessage::RequestStatus) => {
                                ServerMessage::status(orchestrator.status(&tenant_id))
                            }
                            Err(e) => {
                                tracing::debug!(client_id = %client_id, "Unparseable client message: {}", e);
                                ServerMessage::error("INVALID_MESSAGE", "Unrecognized message")
                            }
                        };
                        if direct_tx.send(reply).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Binary(_)) => {
                        tracing::warn!(client_id = %client_id, "Received unsupported binary message");
                    }
                    // Protocol-level ping/pong frames are answered by axum
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                    Ok(Message::Close(_)) => {
                        tracing::debug!(client_id = %client_id, "Client sent close frame");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(client_id = %client_id, "Receive error: {}", e);
                        break;
                    }
                }
            }
        })
    };

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.room_manager.unsubscribe(&client_id).await;
    tracing::debug!(tenant_id = %tenant_id, client_id = %client_id, "Live client left");
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// Create axum router for the WebSocket endpoint.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", websocket_router().with_state(ws_state));
/// ```
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/sessions/:tenant_id/live", get(ws_handler))
}
