//! Integration tests for the pong server
//!
//! These tests start the real server on an ephemeral port and drive it with
//! WebSocket clients.

use futures_util::{SinkExt, StreamExt};
use server::config::MatchConfig;
use server::game::GameState;
use server::network;
use shared::{decode_fields, encode_action, Action};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Fields = BTreeMap<String, i64>;

const WAIT: Duration = Duration::from_secs(3);

async fn start_server() -> String {
    let listener = network::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let game = GameState::new(MatchConfig::default());
    tokio::spawn(network::serve(listener, game, Duration::from_millis(5)));
    format!("ws://{}/ws", addr)
}

async fn connect(url: &str) -> Client {
    let (client, _) = connect_async(url).await.expect("Failed to connect");
    client
}

/// Reads snapshots until one satisfies `predicate`
async fn wait_for<F>(client: &mut Client, mut predicate: F) -> Fields
where
    F: FnMut(&Fields) -> bool,
{
    let deadline = Instant::now() + WAIT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let frame = timeout(remaining, client.next())
            .await
            .expect("Timed out waiting for snapshot")
            .expect("Connection ended")
            .expect("Connection error");

        if let Message::Text(text) = frame {
            let fields = decode_fields(text.as_str()).expect("Invalid snapshot");
            if predicate(&fields) {
                return fields;
            }
        }
    }
}

async fn send_action(client: &mut Client, action: Action) {
    client
        .send(Message::text(encode_action(action)))
        .await
        .expect("Failed to send action");
}

fn both_seated(fields: &Fields) -> bool {
    fields.contains_key("player1Y") && fields.contains_key("player2Y")
}

/// CONNECTION LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    /// A lone player sees their own paddle and a frozen ball
    #[tokio::test]
    async fn single_player_waits_with_frozen_ball() {
        let url = start_server().await;
        let mut first = connect(&url).await;

        let fields = wait_for(&mut first, |f| f.contains_key("player1Y")).await;
        assert!(!fields.contains_key("player2Y"));
        assert_eq!(fields["player1Y"], 250);

        let later = wait_for(&mut first, |_| true).await;
        assert_eq!(later["ballX"], 400);
        assert_eq!(later["ballY"], 300);
    }

    /// Both players appear in every client's snapshots once seated
    #[tokio::test]
    async fn two_players_share_snapshots() {
        let url = start_server().await;
        let mut first = connect(&url).await;
        wait_for(&mut first, |f| f.contains_key("player1Y")).await;
        let mut second = connect(&url).await;

        let seen_by_first = wait_for(&mut first, both_seated).await;
        let seen_by_second = wait_for(&mut second, both_seated).await;

        for fields in [&seen_by_first, &seen_by_second] {
            assert_eq!(fields.len(), 7);
            assert!((0..=2).contains(&fields["audio"]));
        }
    }

    /// A third connection is turned away and the seated players are untouched
    #[tokio::test]
    async fn third_player_is_rejected() {
        let url = start_server().await;
        let mut first = connect(&url).await;
        wait_for(&mut first, |f| f.contains_key("player1Y")).await;
        let _second = connect(&url).await;
        wait_for(&mut first, both_seated).await;

        let mut third = connect(&url).await;
        let frame = timeout(WAIT, third.next())
            .await
            .expect("Rejected connection was left hanging");
        match frame {
            Some(Ok(Message::Text(text))) => panic!("Rejected client got a snapshot: {}", text),
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {}
            Some(Ok(other)) => panic!("Unexpected frame: {:?}", other),
        }

        let fields = wait_for(&mut first, |_| true).await;
        assert!(both_seated(&fields));
        assert!(!fields.contains_key("player3Y"));
    }

    /// Disconnecting frees the slot and a newcomer takes it over
    #[tokio::test]
    async fn disconnect_frees_slot() {
        let url = start_server().await;
        let mut first = connect(&url).await;
        wait_for(&mut first, |f| f.contains_key("player1Y")).await;
        let mut second = connect(&url).await;
        wait_for(&mut first, both_seated).await;

        second.close(None).await.expect("Failed to close");
        drop(second);

        let fields = wait_for(&mut first, |f| !f.contains_key("player2Y")).await;
        assert!(fields.contains_key("player1Y"));

        // The ball is frozen while the slot is empty.
        let frozen = wait_for(&mut first, |_| true).await;
        let still = wait_for(&mut first, |_| true).await;
        assert_eq!(frozen["ballX"], still["ballX"]);
        assert_eq!(frozen["ballY"], still["ballY"]);

        send_action(&mut first, Action::MoveDown).await;
        wait_for(&mut first, |f| f.get("player1Y") == Some(&270)).await;

        let _replacement = connect(&url).await;
        let fields = wait_for(&mut first, both_seated).await;
        assert_eq!(fields["player1Y"], 250);
        assert_eq!(fields["player2Y"], 250);
    }
}

/// INPUT HANDLING TESTS
mod input_tests {
    use super::*;

    /// Paddle commands show up in the next snapshot
    #[tokio::test]
    async fn moves_are_broadcast() {
        let url = start_server().await;
        let mut first = connect(&url).await;
        wait_for(&mut first, |f| f.contains_key("player1Y")).await;
        let mut second = connect(&url).await;
        wait_for(&mut second, both_seated).await;

        send_action(&mut first, Action::MoveUp).await;
        send_action(&mut second, Action::MoveDown).await;

        let fields = wait_for(&mut first, |f| {
            f.get("player1Y") == Some(&230) && f.get("player2Y") == Some(&270)
        })
        .await;
        assert!(both_seated(&fields));
    }

    /// Malformed and unknown messages are dropped without closing the connection
    #[tokio::test]
    async fn bad_messages_keep_connection_open() {
        let url = start_server().await;
        let mut first = connect(&url).await;
        wait_for(&mut first, |f| f.contains_key("player1Y")).await;

        first
            .send(Message::text("{definitely not json"))
            .await
            .unwrap();
        first
            .send(Message::text(
                serde_json::json!({ "action": "teleport" }).to_string(),
            ))
            .await
            .unwrap();
        first
            .send(Message::text(
                serde_json::json!({ "action": "moveUp", "speed": 999 }).to_string(),
            ))
            .await
            .unwrap();

        let fields = wait_for(&mut first, |f| f.get("player1Y") == Some(&230)).await;
        assert_eq!(fields["player1Y"], 230);
    }

    /// Paddles never leave the canvas no matter how many commands arrive
    #[tokio::test]
    async fn paddle_clamped_at_top() {
        let url = start_server().await;
        let mut first = connect(&url).await;
        wait_for(&mut first, |f| f.contains_key("player1Y")).await;

        for _ in 0..30 {
            send_action(&mut first, Action::MoveUp).await;
        }

        wait_for(&mut first, |f| f.get("player1Y") == Some(&0)).await;
        send_action(&mut first, Action::MoveDown).await;
        let fields = wait_for(&mut first, |f| f.get("player1Y") != Some(&0)).await;
        assert_eq!(fields["player1Y"], 20);
    }
}
