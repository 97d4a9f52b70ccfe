//! Integration tests for WebSocket connect, presence join/leave, chat
//! fan-out, and protocol error tolerance.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use parley::chat::event::{ClientEvent, EventKind, ServerEvent, TransportKind};
use parley::chat::presence::{JOINED_TEXT, LEFT_TEXT};
use parley::registry::Registry;
use parley::state::AppState;

type WsWrite = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsRead = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Start the server on an ephemeral port and return its address.
async fn start_test_server() -> SocketAddr {
    let state = AppState::new(Registry::new(), Duration::from_secs(60));
    let app = parley::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

/// Connect a client and consume the initial transport event.
async fn connect(addr: SocketAddr) -> (WsWrite, WsRead) {
    let url = format!("ws://{}/ws", addr);
    let (stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("Failed to connect to WebSocket");
    let (write, mut read) = stream.split();
    match next_event(&mut read).await {
        ServerEvent::Transport { transport } => {
            assert_eq!(transport, TransportKind::Websocket);
        }
        other => panic!("expected transport event first, got {:?}", other),
    }
    (write, read)
}

/// Read the next server event, failing the test after two seconds.
async fn next_event(read: &mut WsRead) -> ServerEvent {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), read.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("websocket error");
        match message {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("decodable server event");
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

/// Assert that no event arrives within `window`.
async fn assert_silent(read: &mut WsRead, window: Duration) {
    let result = tokio::time::timeout(window, read.next()).await;
    assert!(result.is_err(), "expected silence, got {:?}", result);
}

async fn send(write: &mut WsWrite, event: &ClientEvent) {
    let json = serde_json::to_string(event).unwrap();
    write
        .send(Message::Text(json.into()))
        .await
        .expect("Failed to send event");
}

fn join(label: &str) -> ClientEvent {
    ClientEvent::Join {
        label: label.to_string(),
    }
}

fn chat(text: &str, label: &str) -> ClientEvent {
    ClientEvent::Chat {
        text: text.to_string(),
        label: label.to_string(),
    }
}

fn expect_chat(event: ServerEvent, text: &str, label: &str, kind: EventKind) {
    match event {
        ServerEvent::Chat(event) => {
            assert_eq!(event.text, text);
            assert_eq!(event.label, label);
            assert_eq!(event.kind, kind);
        }
        other => panic!("expected chat event, got {:?}", other),
    }
}

#[tokio::test]
async fn transport_event_arrives_on_connect() {
    let addr = start_test_server().await;
    // connect() itself asserts the first event is transport: websocket
    let (_write, mut read) = connect(addr).await;
    assert_silent(&mut read, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn join_is_announced_to_everyone_including_the_joiner() {
    let addr = start_test_server().await;
    let (mut write_a, mut read_a) = connect(addr).await;
    let (_write_b, mut read_b) = connect(addr).await;

    send(&mut write_a, &join("alice")).await;

    for read in [&mut read_a, &mut read_b] {
        expect_chat(next_event(read).await, JOINED_TEXT, "alice", EventKind::System);
    }
}

#[tokio::test]
async fn chat_scenario_with_three_channels() {
    // End to end: A joins as alice, B joins as bob, C lurks unlabeled;
    // A says hi; C leaves silently; B leaves audibly.
    let addr = start_test_server().await;
    let (mut write_a, mut read_a) = connect(addr).await;
    let (mut write_b, mut read_b) = connect(addr).await;
    let (write_c, mut read_c) = connect(addr).await;

    send(&mut write_a, &join("alice")).await;
    for read in [&mut read_a, &mut read_b, &mut read_c] {
        expect_chat(next_event(read).await, JOINED_TEXT, "alice", EventKind::System);
    }

    send(&mut write_b, &join("bob")).await;
    for read in [&mut read_a, &mut read_b, &mut read_c] {
        expect_chat(next_event(read).await, JOINED_TEXT, "bob", EventKind::System);
    }

    send(&mut write_a, &chat("hi", "alice")).await;
    for read in [&mut read_a, &mut read_b, &mut read_c] {
        expect_chat(next_event(read).await, "hi", "alice", EventKind::User);
    }

    // C never joined: closing it must announce nothing.
    drop(write_c);
    drop(read_c);
    assert_silent(&mut read_a, Duration::from_millis(400)).await;

    // B leaves: the remaining channel hears it.
    drop(write_b);
    drop(read_b);
    expect_chat(next_event(&mut read_a).await, LEFT_TEXT, "bob", EventKind::System);
}

#[tokio::test]
async fn labeled_lifetime_produces_join_then_leave_in_order() {
    let addr = start_test_server().await;
    let (_observer_write, mut observer_read) = connect(addr).await;
    let (mut member_write, member_read) = connect(addr).await;

    send(&mut member_write, &join("carol")).await;
    expect_chat(
        next_event(&mut observer_read).await,
        JOINED_TEXT,
        "carol",
        EventKind::System,
    );

    drop(member_write);
    drop(member_read);
    expect_chat(
        next_event(&mut observer_read).await,
        LEFT_TEXT,
        "carol",
        EventKind::System,
    );
}

#[tokio::test]
async fn unlabeled_disconnect_is_silent() {
    let addr = start_test_server().await;
    let (_observer_write, mut observer_read) = connect(addr).await;
    let (lurker_write, lurker_read) = connect(addr).await;

    drop(lurker_write);
    drop(lurker_read);

    assert_silent(&mut observer_read, Duration::from_millis(400)).await;
}

#[tokio::test]
async fn repeat_join_is_ignored() {
    let addr = start_test_server().await;
    let (_observer_write, mut observer_read) = connect(addr).await;
    let (mut member_write, mut member_read) = connect(addr).await;

    send(&mut member_write, &join("alice")).await;
    expect_chat(
        next_event(&mut observer_read).await,
        JOINED_TEXT,
        "alice",
        EventKind::System,
    );
    expect_chat(
        next_event(&mut member_read).await,
        JOINED_TEXT,
        "alice",
        EventKind::System,
    );

    // A second join must not re-broadcast or relabel.
    send(&mut member_write, &join("somebody-else")).await;
    assert_silent(&mut observer_read, Duration::from_millis(400)).await;

    // The leave still carries the first label.
    drop(member_write);
    drop(member_read);
    expect_chat(
        next_event(&mut observer_read).await,
        LEFT_TEXT,
        "alice",
        EventKind::System,
    );
}

#[tokio::test]
async fn malformed_frames_are_dropped_without_killing_the_channel() {
    let addr = start_test_server().await;
    let (mut write_a, _read_a) = connect(addr).await;
    let (_write_b, mut read_b) = connect(addr).await;

    // Not JSON, missing required field, empty join label: all dropped.
    for raw in ["not json", r#"{"event":"chat"}"#, r#"{"event":"join","label":"  "}"#] {
        write_a
            .send(Message::Text(raw.to_string().into()))
            .await
            .expect("Failed to send raw frame");
    }
    assert_silent(&mut read_b, Duration::from_millis(300)).await;

    // The channel is still alive and can chat normally.
    send(&mut write_a, &chat("still here", "anon")).await;
    expect_chat(
        next_event(&mut read_b).await,
        "still here",
        "anon",
        EventKind::User,
    );
}

#[tokio::test]
async fn chat_kind_is_forced_to_user() {
    let addr = start_test_server().await;
    let (mut write_a, _read_a) = connect(addr).await;
    let (_write_b, mut read_b) = connect(addr).await;

    // A client claiming kind:"system" must still come out as user.
    let spoof = r#"{"event":"chat","text":"spoof","label":"eve","kind":"system"}"#;
    write_a
        .send(Message::Text(spoof.to_string().into()))
        .await
        .expect("Failed to send spoofed frame");

    expect_chat(next_event(&mut read_b).await, "spoof", "eve", EventKind::User);
}

#[tokio::test]
async fn ping_pong() {
    let addr = start_test_server().await;
    let (mut write, mut read) = connect(addr).await;

    write
        .send(Message::Ping(vec![42, 43, 44].into()))
        .await
        .expect("Failed to send ping");

    let msg = tokio::time::timeout(Duration::from_secs(2), read.next())
        .await
        .expect("Expected pong within timeout");

    match msg {
        Some(Ok(Message::Pong(data))) => {
            assert_eq!(data.as_ref(), &[42, 43, 44], "Pong data should match ping");
        }
        other => panic!("Expected Pong message, got: {:?}", other),
    }
}
