//! WebSocket upgrade endpoint.
//!
//! `GET /ws` opens a fresh channel. `GET /ws?sid=<uuid>` upgrades an
//! existing polling session in place, keeping its channel identity.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::chat::event::TransportKind;
use crate::poll;
use crate::registry::Channel;
use crate::state::AppState;
use crate::ws::actor;

/// Close code sent when an upgrade names an unknown, already upgraded, or
/// already closed polling session.
const CLOSE_UNKNOWN_SESSION: u16 = 4040;

/// Query parameters for the WebSocket endpoint.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Polling session to upgrade, if any.
    pub sid: Option<Uuid>,
}

/// GET /ws — upgrade to WebSocket and hand the socket to a connection actor.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match params.sid {
        None => ws.on_upgrade(move |socket| fresh_connection(socket, state)),
        Some(sid) => ws.on_upgrade(move |socket| upgrade_session(socket, state, sid)),
    }
}

/// A brand-new channel: fresh id, registered before the actor starts.
async fn fresh_connection(mut socket: WebSocket, state: AppState) {
    let channel_id = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    let channel = Channel::new(channel_id, TransportKind::Websocket, tx.clone());
    if !state.registry.register(channel) {
        // v4 collision — refuse the socket rather than share a queue.
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: 1011,
                reason: "duplicate channel id".into(),
            })))
            .await;
        return;
    }
    actor::run_connection(socket, state, channel_id, tx, rx).await;
}

/// Take over a polling session: the channel keeps its id and label; only
/// the transport and the queue's consumer change. No presence events are
/// produced by an upgrade.
async fn upgrade_session(mut socket: WebSocket, state: AppState, sid: Uuid) {
    let Some(takeover) = poll::take_over(&state, sid).await else {
        tracing::warn!(%sid, "upgrade for unknown polling session");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_UNKNOWN_SESSION,
                reason: "unknown session".into(),
            })))
            .await;
        return;
    };
    state.registry.set_transport(sid, TransportKind::Websocket);
    tracing::info!(channel_id = %sid, "polling session upgraded to websocket");
    actor::run_connection(socket, state, sid, takeover.sender, takeover.outbox).await;
}
