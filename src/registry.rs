//! Connection registry: the live set of duplex channels.
//!
//! The registry is the sole source of truth for broadcast fan-out targets:
//! a channel receives events iff it is a member. It is constructed once at
//! process start and shared by handle; every operation is a single atomic
//! map call, so no caller ever holds a map guard across an await point.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::chat::event::{ServerEvent, TransportKind};

/// Sender half of a channel's outbound event queue.
/// Any part of the system can clone this to push events to one client.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// One client's persistent duplex connection.
#[derive(Debug, Clone)]
pub struct Channel {
    id: Uuid,
    label: Option<String>,
    transport: TransportKind,
    sender: EventSender,
}

impl Channel {
    pub fn new(id: Uuid, transport: TransportKind, sender: EventSender) -> Self {
        Self {
            id,
            label: None,
            transport,
            sender,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Display label, set at most once via [`Registry::set_label`].
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }
}

/// Outcome of a label assignment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOutcome {
    /// First assignment — the caller should announce the join.
    First,
    /// The channel is already labeled; the attempt is ignored.
    AlreadySet,
    /// No live channel with that id.
    NotFound,
}

/// The live channel set.
#[derive(Clone)]
pub struct Registry {
    channels: Arc<DashMap<Uuid, Channel>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Add a newly opened channel. Returns false on an id collision, which
    /// must not happen under v4 id generation.
    pub fn register(&self, channel: Channel) -> bool {
        let id = channel.id;
        match self.channels.entry(id) {
            Entry::Occupied(_) => {
                tracing::error!(channel_id = %id, "refusing duplicate channel id");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(channel);
                tracing::debug!(channel_id = %id, total = self.channels.len(), "channel registered");
                true
            }
        }
    }

    /// Attach a display label. The transition is one-way: once labeled, a
    /// channel keeps its label for the rest of its life. No uniqueness is
    /// enforced — two channels may share a label.
    pub fn set_label(&self, id: Uuid, label: &str) -> LabelOutcome {
        match self.channels.get_mut(&id) {
            None => LabelOutcome::NotFound,
            Some(mut channel) => {
                if channel.label.is_some() {
                    LabelOutcome::AlreadySet
                } else {
                    channel.label = Some(label.to_string());
                    LabelOutcome::First
                }
            }
        }
    }

    /// Record the active transport after an upgrade. Identity and label
    /// are untouched. Returns false for unknown ids.
    pub fn set_transport(&self, id: Uuid, transport: TransportKind) -> bool {
        match self.channels.get_mut(&id) {
            None => false,
            Some(mut channel) => {
                channel.transport = transport;
                true
            }
        }
    }

    /// Remove a channel, returning it so the caller can decide whether to
    /// announce the leave. A second call with the same id returns None and
    /// has no side effects.
    pub fn unregister(&self, id: Uuid) -> Option<Channel> {
        let removed = self.channels.remove(&id).map(|(_, channel)| channel);
        if removed.is_some() {
            tracing::debug!(channel_id = %id, total = self.channels.len(), "channel unregistered");
        }
        removed
    }

    /// Outbound sender for one channel, if it is still live.
    pub fn sender_of(&self, id: Uuid) -> Option<EventSender> {
        self.channels.get(&id).map(|channel| channel.sender.clone())
    }

    /// Fan-out target set, read at call time. Iterating the snapshot is
    /// safe while other channels connect or disconnect.
    pub fn snapshot(&self) -> Vec<(Uuid, EventSender)> {
        self.channels
            .iter()
            .map(|entry| (*entry.key(), entry.value().sender.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
