//! Terminal chat client.
//!
//! Connects over WebSocket, sends an optional join event, forwards stdin
//! lines as chat events, and renders incoming events one per line with a
//! local timestamp (the protocol carries none).

use chrono::Local;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::tungstenite::Message;

use parley::chat::event::{ChatEvent, ClientEvent, EventKind, ServerEvent};

#[derive(Parser, Debug)]
#[command(
    name = "parley-client",
    version,
    about = "Terminal client for the parley chat server"
)]
struct Args {
    /// WebSocket URL of the server
    #[arg(long, env = "PARLEY_URL", default_value = "ws://127.0.0.1:3000/ws")]
    url: String,

    /// Display label to join with; omit to lurk unlabeled
    #[arg(long)]
    label: Option<String>,
}

fn render(event: &ServerEvent) {
    let stamp = Local::now().format("%H:%M:%S");
    match event {
        ServerEvent::Chat(ChatEvent { text, label, kind }) => match kind {
            EventKind::User => println!("[{stamp}] {label}: {text}"),
            EventKind::System => println!("[{stamp}] * {label} {text}"),
        },
        ServerEvent::Transport { transport } => {
            println!("[{stamp}] * transport: {}", transport.as_str());
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (ws_stream, _) = tokio_tungstenite::connect_async(&args.url).await?;
    println!("* connected to {}", args.url);
    let (mut write, mut read) = ws_stream.split();

    if let Some(label) = &args.label {
        let join = serde_json::to_string(&ClientEvent::Join {
            label: label.clone(),
        })?;
        write.send(Message::Text(join.into())).await?;
    }

    // Reader task: render every server event as it arrives.
    let reader = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<ServerEvent>(text.as_str()) {
                        Ok(event) => render(&event),
                        Err(error) => eprintln!("* undecodable event: {error}"),
                    }
                }
                Ok(Message::Close(_)) => {
                    println!("* server closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(error) => {
                    eprintln!("* connection error: {error}");
                    break;
                }
            }
        }
    });

    // Forward stdin lines as chat events until EOF or /quit.
    let label = args.label.clone().unwrap_or_default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        let chat = serde_json::to_string(&ClientEvent::Chat {
            text: line,
            label: label.clone(),
        })?;
        write.send(Message::Text(chat.into())).await?;
    }

    let _ = write.send(Message::Close(None)).await;
    reader.abort();
    println!("* disconnected");
    Ok(())
}
