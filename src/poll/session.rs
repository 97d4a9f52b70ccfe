//! Polling session table and lifecycle.

use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::chat::event::ServerEvent;
use crate::chat::presence;
use crate::registry::EventSender;
use crate::state::AppState;

/// Live polling sessions, keyed by channel id.
pub type SessionTable = Arc<DashMap<Uuid, PollSession>>;

/// Create a new empty session table.
pub fn new_session_table() -> SessionTable {
    Arc::new(DashMap::new())
}

/// One polling session: the receive half of a channel's outbound queue,
/// parked between GET requests.
#[derive(Clone)]
pub struct PollSession {
    /// Slot for the queue's receive half. `None` once a WebSocket upgrade
    /// has taken ownership. The async Mutex serializes concurrent polls.
    outbox: Arc<tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<ServerEvent>>>>,
    last_seen: Arc<Mutex<Instant>>,
}

impl PollSession {
    pub fn new(outbox: mpsc::UnboundedReceiver<ServerEvent>) -> Self {
        Self {
            outbox: Arc::new(tokio::sync::Mutex::new(Some(outbox))),
            last_seen: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Record client activity; the reaper closes sessions that stay quiet.
    pub fn touch(&self) {
        if let Ok(mut last_seen) = self.last_seen.lock() {
            *last_seen = Instant::now();
        }
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .map(|last_seen| last_seen.elapsed())
            .unwrap_or_default()
    }

    pub(crate) fn outbox(
        &self,
    ) -> &tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<ServerEvent>>> {
        &self.outbox
    }
}

/// Queue handles passed to the WebSocket actor on upgrade.
pub struct Takeover {
    pub sender: EventSender,
    pub outbox: mpsc::UnboundedReceiver<ServerEvent>,
}

/// Hand a session's queue to a WebSocket upgrade.
///
/// The session is removed from the table first, so the reaper and DELETE
/// cannot close the channel underneath the new socket; any in-flight poll
/// finishes before the queue changes hands. Returns None for unknown,
/// already upgraded, or already closed sessions.
pub async fn take_over(state: &AppState, sid: Uuid) -> Option<Takeover> {
    let (_, session) = state.poll_sessions.remove(&sid)?;
    let outbox = session.outbox.lock().await.take()?;
    let sender = state.registry.sender_of(sid)?;
    Some(Takeover { sender, outbox })
}

/// Close a polling session: unregister the channel and announce the leave
/// if it was labeled. Idempotent — a second close finds no session, does
/// nothing, and never double-broadcasts a leave.
pub fn close(state: &AppState, sid: Uuid) -> bool {
    if state.poll_sessions.remove(&sid).is_none() {
        return false;
    }
    if let Some(channel) = state.registry.unregister(sid) {
        if let Some(label) = channel.label() {
            presence::announce_leave(&state.registry, label);
        }
    }
    tracing::info!(channel_id = %sid, "polling session closed");
    true
}

/// Close every session idle longer than `timeout`. Called by the reaper;
/// an idle poll client is indistinguishable from one that went away, so
/// this drives the same unregister/leave path as an abrupt disconnect.
pub fn reap_idle(state: &AppState, timeout: Duration) {
    let expired: Vec<Uuid> = state
        .poll_sessions
        .iter()
        .filter(|entry| entry.value().idle_for() > timeout)
        .map(|entry| *entry.key())
        .collect();
    for sid in expired {
        tracing::info!(channel_id = %sid, "reaping idle polling session");
        close(state, sid);
    }
}
