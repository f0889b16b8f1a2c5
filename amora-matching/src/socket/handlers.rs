use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use amora_shared::errors::AppResult;
use amora_shared::middleware::validate_jwt_with_secret;

use super::frames::{ClientFrame, ServerFrame};
use super::relay;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: String,
}

/// GET /ws?token=<jwt> - upgrade to the live chat channel.
///
/// The token travels as a query parameter because browsers cannot set
/// headers on a WebSocket upgrade.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let claims = validate_jwt_with_secret(&params.token, &state.config.jwt_secret)?;
    let user_id = claims.sub;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, user_id: Uuid) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();
    let conn_id = state.registry.register(user_id, tx);

    tracing::info!(user_id = %user_id, conn_id = %conn_id, "live connection opened");

    loop {
        tokio::select! {
            // Outbound: frames queued for this user by the relay.
            outbound = rx.recv() => {
                let Some(frame) = outbound else {
                    // Our handle was evicted by a newer connection.
                    tracing::debug!(user_id = %user_id, conn_id = %conn_id, "connection replaced, closing");
                    break;
                };
                match serde_json::to_string(&frame) {
                    Ok(json) => {
                        if socket.send(WsMessage::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize outbound frame");
                    }
                }
            }
            // Inbound: frames from the client.
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_frame(&state, user_id, &text).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong/binary: nothing to do
                    Some(Err(e)) => {
                        tracing::warn!(user_id = %user_id, error = %e, "websocket receive error");
                        break;
                    }
                }
            }
        }
    }

    state.registry.unregister(user_id, conn_id);
    tracing::info!(user_id = %user_id, conn_id = %conn_id, "live connection closed");
}

/// Malformed frames are dropped with a warning; frame-level failures go back
/// to the sender as an error frame. The connection stays open either way.
async fn handle_frame(state: &Arc<AppState>, user_id: Uuid, text: &str) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "dropping malformed frame");
            return;
        }
    };

    match frame {
        ClientFrame::ChatMessage { match_id, content } => {
            if let Err(e) = relay::send_chat(state, user_id, match_id, &content).await {
                tracing::warn!(
                    user_id = %user_id,
                    match_id = %match_id,
                    error = %e,
                    "chat send rejected"
                );
                state.registry.send_to(
                    user_id,
                    ServerFrame::Error {
                        code: "SEND_FAILED",
                        message: e.to_string(),
                    },
                );
            }
        }
    }
}
