//! Server network layer handling WebSocket connections, snapshot fan-out and the tick loop

use crate::client_manager::ConnectionHandle;
use crate::config::WS_PATH;
use crate::error::ServerError;
use crate::game::GameState;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitStream, StreamExt};
use futures_util::SinkExt;
use log::{debug, error, info, warn};
use shared::decode_action;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};

pub type SharedGame = Arc<Mutex<GameState>>;

/// Fans snapshots out to every seated connection
///
/// Producers only flag that the state changed. The snapshot is built when
/// the broadcaster gets to it, so several changes collapse into one send
/// and the pending audio cue is consumed by the snapshot that carries it.
#[derive(Clone)]
pub struct BroadcastHub {
    game: SharedGame,
    dirty: Arc<watch::Sender<()>>,
    pending: watch::Receiver<()>,
}

impl BroadcastHub {
    pub fn new(game: SharedGame) -> Self {
        let (dirty, pending) = watch::channel(());
        Self {
            game,
            dirty: Arc::new(dirty),
            pending,
        }
    }

    /// Marks the state as changed; never blocks
    pub fn publish(&self) {
        self.dirty.send_replace(());
    }

    pub fn subscribe(&self) -> watch::Receiver<()> {
        self.dirty.subscribe()
    }

    /// Encodes the current state and delivers it to every current member
    ///
    /// The snapshot and the membership copy are taken under one lock scope;
    /// delivery happens after the lock is released. Returns the number of
    /// connections that accepted the payload.
    pub async fn broadcast(&self) -> usize {
        let (payload, recipients) = {
            let mut game = self.game.lock().await;
            (encode_snapshot(&mut game), game.sessions().connections())
        };
        match payload {
            Some(payload) => self.fan_out(recipients, &payload).await,
            None => 0,
        }
    }

    /// Delivers one payload to `recipients`, evicting connections that closed
    pub async fn fan_out(
        &self,
        recipients: Vec<(u8, ConnectionHandle)>,
        payload: &Utf8Bytes,
    ) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        for (slot, connection) in recipients {
            match connection.send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("Delivery to player {} failed: {}", slot + 1, e);
                    dead.push((slot, connection.id()));
                }
            }
        }

        if !dead.is_empty() {
            let mut game = self.game.lock().await;
            for (slot, connection_id) in dead {
                game.remove_connection(slot, connection_id);
            }
        }

        delivered
    }

    /// Broadcaster task: sends one snapshot per batch of state changes
    pub async fn run(self) {
        // Starts from the channel's initial version, so changes flagged
        // before the task was first polled are not missed.
        let mut pending = self.pending.clone();
        while pending.changed().await.is_ok() {
            self.broadcast().await;
        }
    }
}

/// Shared handles given to every connection task
#[derive(Clone)]
pub struct AppState {
    pub game: SharedGame,
    pub hub: BroadcastHub,
}

impl AppState {
    pub fn new(game: GameState) -> Self {
        let game = Arc::new(Mutex::new(game));
        Self {
            hub: BroadcastHub::new(Arc::clone(&game)),
            game,
        }
    }
}

/// Serialises a snapshot, consuming the pending audio cue
fn encode_snapshot(game: &mut GameState) -> Option<Utf8Bytes> {
    match game.snapshot().encode() {
        Ok(json) => Some(Utf8Bytes::from(json)),
        Err(e) => {
            error!("Failed to encode snapshot: {}", e);
            None
        }
    }
}

/// Runs the fixed-rate simulation for the lifetime of the process
pub async fn run_game_loop(state: AppState, tick_interval: Duration) {
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        {
            let mut game = state.game.lock().await;
            game.tick();
            if game.tick % 4000 == 0 {
                debug!(
                    "Tick {}: {} players, phase {:?}",
                    game.tick,
                    game.player_count(),
                    game.phase()
                );
            }
        }

        state.hub.publish();
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(WS_PATH, get(websocket_handler))
        .with_state(state)
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Owns one connection from admission to retirement
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = watch::channel(Utf8Bytes::from(""));
    let connection = ConnectionHandle::new(outbound_tx);
    let connection_id = connection.id();

    let admitted = state.game.lock().await.admit_player(connection);
    let slot = match admitted {
        Ok(slot) => slot,
        Err(e) => {
            warn!("Rejecting connection {}: {}", connection_id, e);
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };
    state.hub.publish();

    let mut writer = tokio::spawn(async move {
        while outbound_rx.changed().await.is_ok() {
            let payload = outbound_rx.borrow_and_update().clone();
            if let Err(e) = sink.send(Message::Text(payload)).await {
                debug!("Write to connection {} failed: {}", connection_id, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    let reason = tokio::select! {
        reason = read_loop(&mut stream, slot, connection_id, &state) => reason,
        _ = &mut writer => "write failure",
    };
    writer.abort();

    state.game.lock().await.remove_connection(slot, connection_id);
    info!("Player {} disconnected: {}", slot + 1, reason);
    state.hub.publish();
}

async fn read_loop(
    stream: &mut SplitStream<WebSocket>,
    slot: u8,
    connection_id: u64,
    state: &AppState,
) -> &'static str {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                handle_client_message(state, slot, connection_id, text.as_str()).await
            }
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => handle_client_message(state, slot, connection_id, text).await,
                Err(_) => warn!("Dropping non UTF-8 frame from player {}", slot + 1),
            },
            Ok(Message::Close(_)) => return "closed by client",
            // Ping and pong are answered by the transport.
            Ok(_) => {}
            Err(e) => {
                debug!("Read error from player {}: {}", slot + 1, e);
                return "read error";
            }
        }
    }
    "connection lost"
}

/// Decodes one client message and applies it to the player's paddle
async fn handle_client_message(state: &AppState, slot: u8, connection_id: u64, payload: &str) {
    let action = match decode_action(payload) {
        Ok(action) => action,
        Err(e) => {
            warn!("Dropping message from player {}: {} ({:?})", slot + 1, e, payload);
            return;
        }
    };

    {
        let mut game = state.game.lock().await;
        if !game.holds_slot(slot, connection_id) || game.apply_input(slot, action).is_none() {
            return;
        }
    }

    state.hub.publish();
}

/// Binds the listener; failure here is fatal for the process
pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Starts the broadcaster and the tick loop, then serves WebSocket upgrades
pub async fn serve(
    listener: TcpListener,
    game: GameState,
    tick_interval: Duration,
) -> Result<(), ServerError> {
    let state = AppState::new(game);

    tokio::spawn(state.hub.clone().run());
    tokio::spawn(run_game_loop(state.clone(), tick_interval));

    let addr = listener.local_addr()?;
    info!("Pong server listening on ws://{}{}", addr, WS_PATH);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
