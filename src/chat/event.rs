//! Wire and domain event types for the chat protocol.
//!
//! The wire is tagged JSON: one object per WebSocket text frame, or per
//! entry in a polling batch. Timestamps are deliberately absent — clients
//! stamp messages locally on render.

use serde::{Deserialize, Serialize};

/// Who produced a chat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    User,
    System,
}

/// Active transport for one channel, observable by the client for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Websocket,
    Polling,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Websocket => "websocket",
            Self::Polling => "polling",
        }
    }
}

/// A chat message as broadcast to every live channel.
/// The label is untrusted display data supplied by the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub text: String,
    pub label: String,
    pub kind: EventKind,
}

impl ChatEvent {
    /// A user-authored message. The kind is forced to `user` here no
    /// matter what the client claimed.
    pub fn user(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            kind: EventKind::User,
        }
    }

    /// A server-synthesized presence message with a fixed phrase.
    pub fn system(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            kind: EventKind::System,
        }
    }
}

/// Events a client may send. Unknown fields are ignored, so a client
/// echoing back a `kind` cannot influence the broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ClientEvent {
    /// Attach a display label to this channel. Only the first join counts.
    Join { label: String },
    /// Say something. Broadcast to every channel, sender included.
    Chat {
        text: String,
        #[serde(default)]
        label: String,
    },
}

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ServerEvent {
    Chat(ChatEvent),
    /// Active transport notification: sent once on connect and once more
    /// if the channel upgrades.
    Transport { transport: TransportKind },
}

impl From<ChatEvent> for ServerEvent {
    fn from(event: ChatEvent) -> Self {
        Self::Chat(event)
    }
}
