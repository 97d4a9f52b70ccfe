//! Presence notifier: system join/leave events driven by the channel
//! lifecycle, never by chat content.

use crate::chat::broadcast;
use crate::chat::event::ChatEvent;
use crate::registry::Registry;

/// Fixed phrase broadcast when a channel first sets its label.
pub const JOINED_TEXT: &str = "has joined the chat";
/// Fixed phrase broadcast when a labeled channel closes.
pub const LEFT_TEXT: &str = "has left the chat";

/// Announce a first label assignment to everyone, the joiner included.
pub fn announce_join(registry: &Registry, label: &str) {
    tracing::info!(label, "channel joined");
    broadcast::broadcast(registry, &ChatEvent::system(JOINED_TEXT, label));
}

/// Announce the close of a labeled channel. Channels that never joined
/// produce no leave event, matching the join announcement they never got.
pub fn announce_leave(registry: &Registry, label: &str) {
    tracing::info!(label, "channel left");
    broadcast::broadcast(registry, &ChatEvent::system(LEFT_TEXT, label));
}
