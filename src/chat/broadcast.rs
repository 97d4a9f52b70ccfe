//! Broadcast dispatcher: best-effort fan-out to every live channel.

use crate::chat::event::ChatEvent;
use crate::registry::Registry;

/// Fan `event` out to every channel currently in the registry, sender
/// included. Delivery is attempted for every member of a snapshot taken at
/// call time; a send onto an already-closed channel is logged and never
/// aborts delivery to the rest. No acknowledgment, no retry, no queueing
/// of undelivered events. Returns the number of delivery attempts.
pub fn broadcast(registry: &Registry, event: &ChatEvent) -> usize {
    let targets = registry.snapshot();
    let mut attempts = 0;
    for (channel_id, sender) in targets {
        attempts += 1;
        if sender.send(event.clone().into()).is_err() {
            // Receiver already gone — the channel is mid-disconnect and
            // its own lifecycle will unregister it.
            tracing::debug!(%channel_id, "skipping send to closed channel");
        }
    }
    attempts
}
