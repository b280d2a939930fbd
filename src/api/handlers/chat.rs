//! Support chat: REST send plus the WebSocket entry point.
//!
//! Outbound messages go to the admin Telegram chat fire-and-forget; the
//! request never waits on Telegram. Admin replies come back through the
//! in-process relay and are pushed to the user's open sockets.

use axum::extract::rejection::JsonRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::middleware::identity_from_handshake;
use crate::auth::models::{CurrentUser, Identity};
use crate::auth::user::User;

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn read_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn forward_to_admin(state: &ApiState, user: &User, text: String) {
    let notifier = state.notifier.clone();
    let user_id = user.id.clone();
    let login = user.login.clone();

    // Fire-and-forget: failures are logged server-side only.
    tokio::spawn(async move {
        if let Err(err) = notifier.notify_admin(&user_id, &login, &text).await {
            warn!(%user_id, error = %err, "Failed to bridge chat message");
        }
    });
}

#[instrument(skip(state, current, body), fields(user_id = %current.0.id), name = "http_chat_send")]
pub async fn send_message(
    State(state): State<ApiState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<SendMessageBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let body = read_body(body)?;
    let text = match body.message {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(ApiError::bad_request("message must not be empty")),
    };

    forward_to_admin(&state, &current.0, text);
    Ok(Json(MessageResponse { message: "Message sent".to_string() }))
}

/// WebSocket handshake. The token may arrive via `?token=` or the
/// authorization header; connections without a usable token are accepted
/// anonymously but cannot send.
#[instrument(skip_all, name = "http_chat_ws")]
pub async fn websocket(
    State(state): State<ApiState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    upgrade: WebSocketUpgrade,
) -> Response {
    let identity = identity_from_handshake(&state.auth, query.token.as_deref(), &headers).await;
    upgrade.on_upgrade(move |socket| handle_socket(state, identity, socket))
}

async fn handle_socket(state: ApiState, identity: Identity, socket: WebSocket) {
    match identity {
        Identity::User(user) => authenticated_session(state, user, socket).await,
        Identity::Anonymous => anonymous_session(socket).await,
    }
}

/// Anonymous peers get an error reply for anything they send; the connection
/// itself stays open so clients can authenticate and reconnect gracefully.
async fn anonymous_session(mut socket: WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(_) => {
                let reply = Message::Text("error: authentication required".into());
                if socket.send(reply).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

async fn authenticated_session(state: ApiState, user: User, socket: WebSocket) {
    info!(user_id = %user.id, "Chat socket opened");
    let mut replies = state.relay.subscribe(&user.id);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        forward_to_admin(&state, &user, trimmed.to_string());
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(user_id = %user.id, error = %err, "Chat socket error");
                    break;
                }
            },
            reply = replies.recv() => match reply {
                Ok(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(user_id = %user.id, skipped, "Chat socket fell behind, replies dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    drop(replies);
    state.relay.prune(&user.id);
    info!(user_id = %user.id, "Chat socket closed");
}
