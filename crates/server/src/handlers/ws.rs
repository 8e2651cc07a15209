//! WebSocket endpoint
//!
//! One task per connection reads inbound events in order; a writer task
//! drains the connection's outbound channel into the socket. The bearer
//! token is checked before the upgrade, so a bad credential is an HTTP 401
//! and never touches the registry.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::AppState;
use crate::error::{Error, Result};
use crate::models::{ClientEvent, ServerEvent, UserInfo};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: String,
}

/// GET /ws?token=...
pub async fn ws_connect(
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    let user = state
        .auth
        .validate_session(&params.token)
        .await
        .map_err(|_| Error::AuthFailInvalidToken)?;

    info!("WS connect: {}", user.username);

    Ok(ws.on_upgrade(move |socket| handle_connection(socket, state, user)))
}

async fn handle_connection(socket: WebSocket, state: AppState, user: UserInfo) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let epoch = state.presence.on_connect(&user, tx.clone()).await;

    // Handshake: the client learns which identity this connection resolved
    // to, so it can tell its own messages from its peer's.
    let _ = tx.send(ServerEvent::Ready { user: user.clone() });

    let (mut sink, mut stream) = socket.split();

    let writer_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let superseded = matches!(event, ServerEvent::Superseded);

            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }

            if superseded {
                // A newer login owns this user now; close out.
                let _ = sink.close().await;
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        let WsMessage::Text(text) = frame else {
            continue;
        };

        let Ok(event) = serde_json::from_str::<ClientEvent>(text.as_str()) else {
            warn!("unparseable frame from {}, ignoring", user.username);
            continue;
        };

        match event {
            ClientEvent::ChatMessage {
                seq,
                recipient_id,
                text,
            } => {
                let ack = match state.router.send(&user, &recipient_id, &text).await {
                    Ok(message) => ServerEvent::ack_ok(seq, message),
                    Err(e) => {
                        warn!("send from {} failed: {}", user.username, e);
                        ServerEvent::ack_error(seq, e.to_string())
                    }
                };
                if tx.send(ack).is_err() {
                    break;
                }
            }
            ClientEvent::Typing { recipient_id } => {
                state.typing.notify_typing(&user, &recipient_id);
            }
        }
    }

    state.presence.on_disconnect(&user.id, epoch).await;
    writer_task.abort();

    info!("WS disconnect: {}", user.username);
}
