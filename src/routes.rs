//! Router assembly.

use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;

use crate::poll;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// How often the reaper sweeps for idle polling sessions.
const REAP_INTERVAL: Duration = Duration::from_secs(15);

/// Build the axum Router and spawn the polling-session reaper.
pub fn build_router(state: AppState) -> Router {
    // Background task: close polling sessions whose client stopped calling
    // in. Drives the same unregister/leave path as a disconnect.
    let reaper_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(REAP_INTERVAL).await;
            poll::reap_idle(&reaper_state, reaper_state.poll_session_timeout);
        }
    });

    Router::new()
        .route("/ws", get(ws_handler::ws_upgrade))
        .route("/poll", post(poll::handler::open_session))
        .route(
            "/poll/{sid}",
            get(poll::handler::poll_events)
                .post(poll::handler::submit_event)
                .delete(poll::handler::close_session),
        )
        .route("/health", get(health_check))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
