//! Inbound protocol dispatch.
//!
//! Every inbound frame decodes to a [`ClientEvent`] and is dispatched by
//! pattern match. Malformed input is logged and dropped: the protocol has
//! no error-event type, and a bad frame must never tear down the handling
//! context or affect other channels.

use uuid::Uuid;

use crate::chat::event::{ChatEvent, ClientEvent};
use crate::chat::{broadcast, presence};
use crate::registry::LabelOutcome;
use crate::state::AppState;

/// Maximum chat text length (chars). Longer payloads are dropped.
const MAX_TEXT_LENGTH: usize = 4000;

/// Decode one text frame and dispatch it. Used by the WebSocket reader;
/// the polling transport decodes through the JSON body extractor and calls
/// [`dispatch`] directly.
pub fn handle_text_frame(state: &AppState, channel_id: Uuid, raw: &str) {
    match serde_json::from_str::<ClientEvent>(raw) {
        Ok(event) => dispatch(state, channel_id, event),
        Err(error) => {
            tracing::warn!(%channel_id, %error, "dropping malformed client event");
        }
    }
}

/// Dispatch one decoded client event.
pub fn dispatch(state: &AppState, channel_id: Uuid, event: ClientEvent) {
    match event {
        ClientEvent::Join { label } => handle_join(state, channel_id, &label),
        ClientEvent::Chat { text, label } => handle_chat(state, channel_id, text, label),
    }
}

fn handle_join(state: &AppState, channel_id: Uuid, label: &str) {
    let label = label.trim();
    if label.is_empty() {
        tracing::warn!(%channel_id, "dropping join with empty label");
        return;
    }
    match state.registry.set_label(channel_id, label) {
        LabelOutcome::First => presence::announce_join(&state.registry, label),
        LabelOutcome::AlreadySet => {
            // Labels are immutable for the life of a channel; repeat joins
            // are ignored rather than re-broadcast.
            tracing::debug!(%channel_id, "ignoring repeat join");
        }
        LabelOutcome::NotFound => {
            tracing::warn!(%channel_id, "join for unknown channel");
        }
    }
}

fn handle_chat(state: &AppState, channel_id: Uuid, text: String, label: String) {
    if text.is_empty() {
        tracing::debug!(%channel_id, "dropping empty chat event");
        return;
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        tracing::warn!(%channel_id, "dropping oversized chat event");
        return;
    }
    let attempts = broadcast::broadcast(&state.registry, &ChatEvent::user(text, label));
    tracing::debug!(%channel_id, targets = attempts, "chat event dispatched");
}
