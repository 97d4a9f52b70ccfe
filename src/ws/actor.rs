//! Actor-per-connection WebSocket handling.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use crate::chat::event::{ServerEvent, TransportKind};
use crate::chat::presence;
use crate::registry::EventSender;
use crate::state::AppState;
use crate::ws::protocol;

/// Ping interval: the server pings every 30 seconds so abrupt disconnects
/// cannot leak registry entries.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong deadline: if no pong arrives within 10 seconds after a ping, the
/// connection is closed.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the actor for one WebSocket channel.
///
/// Splits the socket into reader and writer halves:
/// - Writer task: owns the sink; serializes domain events from the
///   channel's outbound queue and forwards raw control frames.
/// - Reader loop: feeds text frames to the protocol dispatcher.
///
/// The caller has already registered the channel (fresh connect) or taken
/// it over from a polling session (upgrade); either way this function owns
/// the cleanup: unregister, plus the leave announcement if labeled. A
/// transport error and a graceful close take the same path.
pub async fn run_connection(
    socket: WebSocket,
    state: AppState,
    channel_id: Uuid,
    events: EventSender,
    outbox: mpsc::UnboundedReceiver<ServerEvent>,
) {
    let (ws_sender, mut ws_receiver) = socket.split();

    // Control queue for ping/pong/close frames. Domain events ride the
    // registry sender so both transports share one outbound path.
    let (control_tx, control_rx) = mpsc::unbounded_channel::<Message>();

    // Tell the client which transport it is on. After an upgrade this is
    // the at-most-once transport change the client is promised.
    let _ = events.send(ServerEvent::Transport {
        transport: TransportKind::Websocket,
    });

    tracing::info!(%channel_id, "websocket actor started");

    let writer_handle = tokio::spawn(writer_task(ws_sender, outbox, control_rx));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Ping task: sends periodic pings and monitors pong responses.
    let ping_control = control_tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_control.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {
                    // Pong received, continue
                }
                _ => {
                    tracing::warn!("pong timeout, closing connection");
                    let _ = ping_control.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: process incoming WebSocket messages
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    protocol::handle_text_frame(&state, channel_id, text.as_str());
                }
                Message::Binary(_) => {
                    tracing::debug!(%channel_id, "ignoring binary frame on text protocol");
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = control_tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(%channel_id, reason = ?frame, "client initiated close");
                    break;
                }
            },
            Some(Err(error)) => {
                // Transport failure: handled exactly like a graceful close.
                tracing::warn!(%channel_id, %error, "websocket receive error");
                break;
            }
            None => {
                tracing::info!(%channel_id, "websocket stream ended");
                break;
            }
        }
    }

    writer_handle.abort();
    ping_handle.abort();

    if let Some(channel) = state.registry.unregister(channel_id) {
        if let Some(label) = channel.label() {
            presence::announce_leave(&state.registry, label);
        }
    }

    tracing::info!(%channel_id, "websocket actor stopped");
}

/// Writer task: owns the sink. Serializes domain events from the outbound
/// queue, forwards control frames, and exits when either queue closes or a
/// send fails.
async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut outbox: mpsc::UnboundedReceiver<ServerEvent>,
    mut control: mpsc::UnboundedReceiver<Message>,
) {
    loop {
        let frame = tokio::select! {
            event = outbox.recv() => match event {
                Some(event) => match serde_json::to_string(&event) {
                    Ok(json) => Message::Text(json.into()),
                    Err(error) => {
                        tracing::error!(%error, "failed to serialize server event");
                        continue;
                    }
                },
                None => break,
            },
            msg = control.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };
        if ws_sender.send(frame).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}
