use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use rand::Rng;
use shared::{decode_fields, encode_action, Action};
use std::time::Duration;
use tokio::time::{interval, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Headless bot that joins a match and mashes the paddle buttons
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the server
    #[clap(short = 's', long, default_value = "ws://127.0.0.1:8080/ws")]
    server: String,

    /// Number of actions to send before disconnecting
    #[clap(short = 'n', long, default_value = "50")]
    actions: u32,

    /// Milliseconds between actions
    #[clap(short = 'i', long, default_value = "200")]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("Connecting to {}", args.server);
    let (ws_stream, _) = connect_async(args.server.as_str()).await?;
    let (mut sender, mut receiver) = ws_stream.split();

    let reader = tokio::spawn(async move {
        let mut received = 0u64;
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    received += 1;
                    match decode_fields(text.as_str()) {
                        // Roughly one line per second at the default tick rate.
                        Ok(fields) if received % 60 == 1 => info!("Snapshot #{}: {:?}", received, fields),
                        Ok(_) => {}
                        Err(e) => warn!("Unreadable snapshot: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("Server closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Connection error: {}", e);
                    break;
                }
            }
        }
        received
    });

    let mut rng = rand::thread_rng();
    let mut ticker = interval(Duration::from_millis(args.interval_ms));
    for _ in 0..args.actions {
        ticker.tick().await;
        let action = if rng.gen_bool(0.5) {
            Action::MoveUp
        } else {
            Action::MoveDown
        };
        if let Err(e) = sender.send(Message::text(encode_action(action))).await {
            warn!("Failed to send {}: {}", action.as_str(), e);
            break;
        }
    }

    info!("Done sending, disconnecting");
    let _ = sender.send(Message::Close(None)).await;
    match timeout(Duration::from_secs(2), reader).await {
        Ok(Ok(received)) => info!("Received {} snapshots", received),
        Ok(Err(e)) => warn!("Reader task failed: {}", e),
        Err(_) => warn!("Reader did not finish in time"),
    }

    Ok(())
}
