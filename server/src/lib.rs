//! # Pong Server Library
//!
//! This library provides the authoritative server for a two-player pong match.
//! It owns the only copy of the ball, paddle and score state, advances the
//! simulation at a fixed rate and streams the result to both clients. Clients
//! render whatever they last received and send nothing but paddle commands.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The ball is moved and collided on the server only. Paddle, wall and goal
//! contacts are resolved in a fixed order every tick, and goals update the
//! score and re-serve the ball.
//!
//! ### Player Slots
//! Exactly two seats exist. The first connection plays the left paddle, the
//! second the right one. Further connections are turned away until a seat is
//! free again. While a seat is empty the ball stays frozen.
//!
//! ### State Broadcasting
//! After every tick and every paddle command the full state is encoded as a
//! flat JSON object and handed to a broadcaster, which delivers it to every
//! seated connection and drops connections it can no longer reach.
//!
//! ## Module Organization
//!
//! ### Physics Module (`physics`)
//! Canvas and ball geometry, and the collision resolver that turns one ball
//! state into the next plus the events raised on the way.
//!
//! ### Client Manager Module (`client_manager`)
//! The session registry: slot admission and retirement, paddle positions and
//! outbound connection handles.
//!
//! ### Game Module (`game`)
//! The match controller: tick, input application, admission resets, score
//! keeping and snapshot building.
//!
//! ### Network Module (`network`)
//! WebSocket upgrade handling, per-connection read and write tasks, the
//! broadcaster and the tick loop.
//!
//! ## Concurrency
//!
//! All match state sits behind one `tokio::sync::Mutex`. Producers (the tick
//! loop and every input handler) mutate under the lock, then flag the change
//! to the broadcaster. The broadcaster builds one snapshot and copies the
//! seat list under the lock, and hands the payload to each connection's
//! single-slot mailbox after releasing it. A slow client never stalls the
//! simulation and always receives the newest state next.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::MatchConfig;
//! use server::game::GameState;
//! use server::network;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let listener = network::bind("127.0.0.1:8080").await?;
//!     let game = GameState::new(MatchConfig::default());
//!
//!     // Ticks every 15ms and serves ws://127.0.0.1:8080/ws until the process exits.
//!     network::serve(listener, game, Duration::from_millis(15)).await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod error;
pub mod game;
pub mod network;
pub mod physics;
