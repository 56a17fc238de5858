//! Error types for the pong server.
//!
//! None of these are retried. Admission and decode failures are logged and
//! shed, delivery failures evict the connection, bind failures end the process.

pub use shared::DecodeError;

/// A connection could not be given a player slot.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("all {capacity} player slots are filled")]
    SlotsFull { capacity: usize },
}

/// A snapshot could not be handed to one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The connection's writer is gone; the slot should be retired.
    #[error("connection closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
