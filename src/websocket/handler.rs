use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::select;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::registry::{ConnectionId, SubscriptionRegistry};

use super::{
    broadcaster::Broadcaster,
    messages::{ClientMessage, WsMessage},
};

/// Shared state for websocket connections.
pub struct WsState {
    pub broadcaster: Broadcaster,
    pub registry: Arc<SubscriptionRegistry>,
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Caller identity for the subscription audit trail. Token validation
    /// happens upstream of this service; the id is taken as given and falls
    /// back to the connection id.
    pub user_id: Option<String>,
}

/// Handle WebSocket upgrade request
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<WsState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

async fn handle_socket(socket: WebSocket, params: WsParams, state: Arc<WsState>) {
    let connection: ConnectionId = Uuid::new_v4();
    let user_id = params.user_id.unwrap_or_else(|| connection.to_string());

    let (mut sender, mut receiver) = socket.split();
    let mut outbound = UnboundedReceiverStream::new(state.broadcaster.register(connection));

    tracing::info!(%connection, %user_id, "websocket client connected");

    loop {
        select! {
            // Pushed messages (price updates, acks) queued for this client
            pushed = outbound.next() => {
                let Some(message) = pushed else { break };
                match serde_json::to_string(&message) {
                    Ok(json) => {
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!(%connection, "failed to encode push message: {e}"),
                }
            }

            // Subscribe/unsubscribe requests from the client
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&text, connection, &user_id, &state);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(%connection, "websocket error: {e}");
                        break;
                    }
                }
            }
        }
    }

    state.broadcaster.unregister(&connection);
    let dropped = state.registry.drop_connection(connection);
    tracing::info!(
        %connection,
        %user_id,
        subscriptions = dropped.len(),
        "websocket client disconnected"
    );
}

fn handle_client_message(
    text: &str,
    connection: ConnectionId,
    user_id: &str,
    state: &Arc<WsState>,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { symbol }) => {
            state.registry.join(connection, user_id, &symbol);
            let _ = state
                .broadcaster
                .send_to(&connection, WsMessage::Subscribed { symbol });
        }
        Ok(ClientMessage::Unsubscribe { symbol }) => {
            state.registry.leave(connection, user_id, &symbol);
            let _ = state
                .broadcaster
                .send_to(&connection, WsMessage::Unsubscribed { symbol });
        }
        Err(e) => {
            let _ = state.broadcaster.send_to(
                &connection,
                WsMessage::Error {
                    message: format!("unrecognized message: {e}"),
                },
            );
        }
    }
}
