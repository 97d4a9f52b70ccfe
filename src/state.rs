//! Shared application state passed to all handlers via the axum State
//! extractor.

use std::time::Duration;

use crate::poll::SessionTable;
use crate::registry::Registry;

#[derive(Clone)]
pub struct AppState {
    /// The live channel set — constructed once at startup and shared by
    /// handle; the sole source of truth for broadcast targets.
    pub registry: Registry,
    /// Polling transport sessions, keyed by channel id.
    pub poll_sessions: SessionTable,
    /// Idle cutoff after which the reaper closes a polling session.
    pub poll_session_timeout: Duration,
}

impl AppState {
    pub fn new(registry: Registry, poll_session_timeout: Duration) -> Self {
        Self {
            registry,
            poll_sessions: crate::poll::new_session_table(),
            poll_session_timeout,
        }
    }
}
