//! Live push endpoints
//!
//! GET /api/live/ws?token=<JWT>
//! Auth: token in the query string (browser WebSockets cannot set headers)
//!
//! Server → client only: `{"event":"ReceiveNotification","data":"<text>"}`
//! text frames plus a ping every 30 s. Client frames other than close are
//! ignored.

use axum::Json;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::error::{ApiResponse, AppError};
use shared::live::{BroadcastRequest, LiveMessage};
use shared::models::{CurrentUser, Role};
use tokio::time::Duration;

use crate::auth::authenticate;
use crate::live::LiveConnection;
use crate::state::AppState;

use super::ApiResult;

const PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: String,
}

/// GET /api/live/ws?token=<JWT>
pub async fn handle_live_ws(
    State(state): State<AppState>,
    Query(query): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let user = authenticate(&state.jwt, &query.token)?;

    // Reserve the slot before upgrading so the per-user cap holds
    let connection = state.live.connect(&user)?;

    Ok(ws.on_upgrade(move |socket| live_session(socket, connection)))
}

async fn live_session(socket: WebSocket, mut connection: LiveConnection) {
    let (mut sink, mut stream) = socket.split();

    let group = connection.open();
    tracing::info!(
        user_id = %connection.user_id(),
        connection_id = connection.id(),
        group = ?group,
        "Live session connected"
    );

    let write_timeout = connection.push_timeout();
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            outbound = connection.recv() => {
                let Some(msg) = outbound else { break };
                match tokio::time::timeout(write_timeout, send_message(&mut sink, &msg)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(())) => break,
                    Err(_) => {
                        tracing::warn!(
                            connection_id = connection.id(),
                            "Live client too slow, closing session"
                        );
                        break;
                    }
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    tracing::info!(
        user_id = %connection.user_id(),
        connection_id = connection.id(),
        "Live session disconnected"
    );
}

async fn send_message<S>(sink: &mut S, msg: &LiveMessage) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// POST /api/admin/broadcast
pub async fn broadcast(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<BroadcastRequest>,
) -> ApiResult<ApiResponse<()>> {
    user.require(Role::Admin)?;
    if req.message.trim().is_empty() {
        return Err(AppError::validation("message must not be empty"));
    }
    let group = req.group.unwrap_or_default();
    tracing::info!(admin_id = %user.id, group = %group, "Live broadcast queued");
    state.notifications.broadcast(group, req.message);
    Ok(Json(ApiResponse::ok()))
}
