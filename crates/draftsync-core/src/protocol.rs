// Wire protocol: server-pushed events and client intents (JSON over WebSocket).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::draft::{Participant, Pick, Player, Room};
use crate::error::ProtocolError;

/// An event pushed by the draft server, tagged by its `event` field.
///
/// Unrecognized kinds deserialize to [`ServerEvent::Unknown`] so that newer
/// servers do not break older clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full authoritative snapshot. Acts as the resync barrier.
    Sync {
        room: Room,
        picks: Vec<Pick>,
        available_players: Vec<Player>,
        /// The server lists participants beside the room rather than in it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participants: Option<Vec<Participant>>,
    },
    UserJoined {
        user: String,
        participants: Vec<Participant>,
    },
    UserLeft {
        user: String,
        participants: Vec<Participant>,
    },
    DraftStarted {
        current_turn: Option<String>,
    },
    PickMade {
        pick_number: u32,
        user: String,
        player: Player,
        next_turn: Option<String>,
    },
    TimerTick {
        seconds_left: u32,
    },
    DraftComplete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        teams: Option<BTreeMap<String, Vec<Player>>>,
    },
    Error {
        message: String,
    },
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// The wire name of this event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Sync { .. } => "sync",
            ServerEvent::UserJoined { .. } => "user_joined",
            ServerEvent::UserLeft { .. } => "user_left",
            ServerEvent::DraftStarted { .. } => "draft_started",
            ServerEvent::PickMade { .. } => "pick_made",
            ServerEvent::TimerTick { .. } => "timer_tick",
            ServerEvent::DraftComplete { .. } => "draft_complete",
            ServerEvent::Error { .. } => "error",
            ServerEvent::Unknown => "unknown",
        }
    }

    pub fn is_barrier(&self) -> bool {
        matches!(self, ServerEvent::Sync { .. })
    }
}

/// Decode one text frame into a [`ServerEvent`].
///
/// Frames with unknown kinds are reported as [`ProtocolError::UnknownKind`]
/// so the kind name reaches the diagnostics.
pub fn decode(text: &str) -> Result<ServerEvent, ProtocolError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed {
            reason: e.to_string(),
        })?;

    let kind = value
        .get("event")
        .and_then(|k| k.as_str())
        .ok_or(ProtocolError::MissingKind)?
        .to_owned();

    let event: ServerEvent =
        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed {
            reason: format!("{kind}: {e}"),
        })?;

    match event {
        ServerEvent::Unknown => Err(ProtocolError::UnknownKind { kind }),
        event => Ok(event),
    }
}

/// An outbound request from this client, tagged by its `action` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientIntent {
    /// Claim a player for the current turn.
    Pick { player_id: String },
    /// Ask the server for a fresh snapshot.
    Sync,
}

impl ClientIntent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
