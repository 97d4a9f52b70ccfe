//! HTTP handlers for the polling transport.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use crate::chat::event::{ClientEvent, ServerEvent, TransportKind};
use crate::poll::session::{self, PollSession};
use crate::registry::Channel;
use crate::state::AppState;
use crate::ws::protocol;

/// How long a GET waits for the first event before returning an empty batch.
const POLL_WAIT: Duration = Duration::from_secs(25);

#[derive(Debug, Serialize)]
pub struct OpenSessionResponse {
    pub sid: Uuid,
    pub transport: TransportKind,
}

/// POST /poll — open a polling session backed by a fresh channel.
pub async fn open_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<OpenSessionResponse>) {
    let sid = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    state
        .registry
        .register(Channel::new(sid, TransportKind::Polling, tx.clone()));
    state.poll_sessions.insert(sid, PollSession::new(rx));

    // Same on-connect transport notification the WebSocket actor sends.
    let _ = tx.send(ServerEvent::Transport {
        transport: TransportKind::Polling,
    });

    tracing::info!(channel_id = %sid, "polling session opened");
    (
        StatusCode::CREATED,
        Json(OpenSessionResponse {
            sid,
            transport: TransportKind::Polling,
        }),
    )
}

/// GET /poll/{sid} — long-poll the session's event queue.
///
/// Waits up to 25 seconds for the first event, then drains whatever else
/// is immediately available. A timeout yields an empty batch; the client
/// just polls again.
pub async fn poll_events(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
) -> Result<Json<Vec<ServerEvent>>, StatusCode> {
    // Clone the session handles out of the map entry so no shard lock is
    // held across the long-poll await.
    let session = state
        .poll_sessions
        .get(&sid)
        .map(|entry| entry.value().clone())
        .ok_or(StatusCode::NOT_FOUND)?;
    session.touch();

    let mut slot = session.outbox().lock().await;
    // Queue already handed to a WebSocket upgrade
    let outbox = slot.as_mut().ok_or(StatusCode::GONE)?;

    let mut events = Vec::new();
    match timeout(POLL_WAIT, outbox.recv()).await {
        Ok(Some(first)) => {
            events.push(first);
            while let Ok(event) = outbox.try_recv() {
                events.push(event);
            }
        }
        // Channel closed server-side
        Ok(None) => return Err(StatusCode::GONE),
        // Nothing arrived — empty batch
        Err(_) => {}
    }
    drop(slot);

    session.touch();
    Ok(Json(events))
}

/// POST /poll/{sid} — submit one client event through the same dispatcher
/// the WebSocket reader uses.
pub async fn submit_event(
    State(state): State<AppState>,
    Path(sid): Path<Uuid>,
    Json(event): Json<ClientEvent>,
) -> StatusCode {
    let Some(session) = state
        .poll_sessions
        .get(&sid)
        .map(|entry| entry.value().clone())
    else {
        return StatusCode::NOT_FOUND;
    };
    session.touch();
    protocol::dispatch(&state, sid, event);
    StatusCode::NO_CONTENT
}

/// DELETE /poll/{sid} — close the session. A second DELETE for the same
/// sid is a 404 and broadcasts nothing.
pub async fn close_session(State(state): State<AppState>, Path(sid): Path<Uuid>) -> StatusCode {
    if session::close(&state, sid) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
