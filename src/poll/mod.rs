//! Long-polling fallback transport.
//!
//! A polling session wraps a registry channel whose outbound queue is
//! drained by GET requests instead of a socket writer. Sessions are keyed
//! by the channel id, so an upgrade to WebSocket keeps the logical
//! connection identity.

pub mod handler;
pub mod session;

pub use session::{close, new_session_table, reap_idle, take_over, PollSession, SessionTable, Takeover};
