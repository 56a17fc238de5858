//! Player slot management for the two-seat pong server
//!
//! This module handles the server-side bookkeeping of connected players:
//! - Admission into one of the fixed player slots (0 = left, 1 = right)
//! - Retirement of slots on disconnect or failed delivery
//! - Paddle positions owned by each slot
//! - Outbound connection handles used by the broadcaster
//!
//! The registry itself is not synchronised; it lives inside the game state
//! and is only touched while the game lock is held.

use crate::error::{AdmissionError, DeliveryError};
use axum::extract::ws::Utf8Bytes;
use log::info;
use shared::MAX_PLAYERS;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Outbound side of a single client connection
///
/// Wraps the single-slot mailbox read by the connection's socket writer
/// task. A new snapshot replaces one the writer has not picked up yet, so a
/// slow client always gets the newest state next. Every handle carries a process-unique id, so a stale eviction can tell a
/// slot's current occupant apart from a connection that already left.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: u64,
    outbound: Arc<watch::Sender<Utf8Bytes>>,
}

impl ConnectionHandle {
    pub fn new(outbound: watch::Sender<Utf8Bytes>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            outbound: Arc::new(outbound),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Hands a payload to the writer without waiting
    ///
    /// Fails only once the writer task has ended and the connection is dead.
    pub fn send(&self, payload: Utf8Bytes) -> Result<(), DeliveryError> {
        self.outbound
            .send(payload)
            .map_err(|_| DeliveryError::Closed)
    }
}

/// An admitted player
#[derive(Debug)]
pub struct PlayerSlot {
    /// Stable slot index for the lifetime of the connection
    pub slot: u8,
    /// Top edge of the paddle, kept within the canvas by the game state
    pub paddle_y: i32,
    pub connection: ConnectionHandle,
}

/// Tracks the occupied player slots
///
/// Slot indices are handed out lowest-free-first and are never shared by two
/// live connections. The slot index decides which paddle a player controls.
pub struct SessionRegistry {
    slots: BTreeMap<u8, PlayerSlot>,
    capacity: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(MAX_PLAYERS)
    }
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: BTreeMap::new(),
            capacity,
        }
    }

    /// Admits a connection into the lowest free slot
    ///
    /// Fails without touching existing slots when all slots are taken.
    pub fn admit(
        &mut self,
        connection: ConnectionHandle,
        paddle_y: i32,
    ) -> Result<u8, AdmissionError> {
        let free = (0..self.capacity)
            .filter_map(|index| u8::try_from(index).ok())
            .find(|index| !self.slots.contains_key(index));

        let Some(slot) = free else {
            return Err(AdmissionError::SlotsFull {
                capacity: self.capacity,
            });
        };

        info!("Player {} connected (connection {})", slot + 1, connection.id());
        self.slots.insert(
            slot,
            PlayerSlot {
                slot,
                paddle_y,
                connection,
            },
        );
        Ok(slot)
    }

    /// Removes a slot; removing an empty slot is a no-op
    pub fn remove(&mut self, slot: u8) -> Option<PlayerSlot> {
        let removed = self.slots.remove(&slot);
        if let Some(player) = &removed {
            info!(
                "Player {} left (connection {})",
                player.slot + 1,
                player.connection.id()
            );
        }
        removed
    }

    /// Removes a slot only while it is still held by `connection_id`
    ///
    /// Both the read loop and the broadcaster may retire the same connection;
    /// whichever comes second, or comes after the slot was re-admitted, finds
    /// nothing to do.
    pub fn remove_connection(&mut self, slot: u8, connection_id: u64) -> Option<PlayerSlot> {
        match self.slots.get(&slot) {
            Some(player) if player.connection.id() == connection_id => self.remove(slot),
            _ => None,
        }
    }

    pub fn get(&self, slot: u8) -> Option<&PlayerSlot> {
        self.slots.get(&slot)
    }

    pub fn get_mut(&mut self, slot: u8) -> Option<&mut PlayerSlot> {
        self.slots.get_mut(&slot)
    }

    pub fn paddle(&self, slot: u8) -> Option<i32> {
        self.slots.get(&slot).map(|player| player.paddle_y)
    }

    /// Paddle positions keyed by slot, in slot order
    pub fn paddles(&self) -> BTreeMap<u8, i32> {
        self.slots
            .iter()
            .map(|(slot, player)| (*slot, player.paddle_y))
            .collect()
    }

    pub fn reset_paddles(&mut self, paddle_y: i32) {
        for player in self.slots.values_mut() {
            player.paddle_y = paddle_y;
        }
    }

    /// Copies the current membership for delivery outside the game lock
    pub fn connections(&self) -> Vec<(u8, ConnectionHandle)> {
        self.slots
            .iter()
            .map(|(slot, player)| (*slot, player.connection.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }
}
