// Error and diagnostic types for the synchronization core.

use std::time::Duration;

use thiserror::Error;

use crate::draft::RoomStatus;

/// A server event that could not be applied: malformed, unrecognized, or
/// out of place in the room lifecycle. Dropped, logged, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed event: {reason}")]
    Malformed { reason: String },

    #[error("event frame has no `event` field")]
    MissingKind,

    #[error("unrecognized event kind `{kind}`")]
    UnknownKind { kind: String },

    #[error("`{kind}` received before any room snapshot")]
    NoRoom { kind: &'static str },

    #[error("`{kind}` is not valid while the room is {status}")]
    InvalidTransition {
        kind: &'static str,
        status: RoomStatus,
    },
}

/// A local pick precondition failed. Raised synchronously; nothing is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPickError {
    #[error("not your turn (current turn: {})", current_turn.as_deref().unwrap_or("nobody"))]
    NotMyTurn { current_turn: Option<String> },

    #[error("player {player_id} is not available")]
    PlayerUnavailable { player_id: String },

    #[error("a pick for player {player_id} is already awaiting confirmation")]
    RequestPending { player_id: String },

    #[error("the draft is not in progress")]
    DraftNotActive,

    #[error("waiting for a resync snapshot from the server")]
    AwaitingResync,
}

/// Failure delivering an outbound intent to the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,

    #[error("outbound queue is full")]
    Full,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Result of a rejected `request_pick`.
#[derive(Debug, Error)]
pub enum PickError {
    #[error(transparent)]
    Invalid(#[from] InvalidPickError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Diagnostics surfaced to session subscribers. Every variant is locally
/// recoverable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("pick for player {player_id} not confirmed within {waited:?}")]
    RequestTimeout { player_id: String, waited: Duration },

    #[error("server error: {message}")]
    Server { message: String },

    #[error("connection lost; awaiting resync")]
    ConnectionLost,
}
