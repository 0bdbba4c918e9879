// Draft room and participant types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a draft room. Only moves forward:
/// `Waiting -> Drafting -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Drafting,
    Completed,
}

impl RoomStatus {
    /// Whether moving from `self` to `next` is a legal single step.
    ///
    /// Staying in the same status is allowed; reverse transitions and
    /// skipping `Drafting` are not.
    pub fn can_transition_to(self, next: RoomStatus) -> bool {
        matches!(
            (self, next),
            (RoomStatus::Waiting, RoomStatus::Waiting)
                | (RoomStatus::Waiting, RoomStatus::Drafting)
                | (RoomStatus::Drafting, RoomStatus::Drafting)
                | (RoomStatus::Drafting, RoomStatus::Completed)
                | (RoomStatus::Completed, RoomStatus::Completed)
        )
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Drafting => "drafting",
            RoomStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// A user seated in a draft room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub user_name: String,
    /// 1-based seat in the draft order.
    pub draft_position: u32,
    #[serde(default)]
    pub is_host: bool,
}

/// A draft room as described by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub code: String,
    pub status: RoomStatus,
    /// Server-declared number of picks made so far.
    #[serde(default)]
    pub current_pick: u32,
    pub total_rounds: u32,
    #[serde(default)]
    pub turn_time_sec: u32,
    /// Participants ordered by draft position. The sync frame sends these
    /// separately, so the field may be absent in a room payload.
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl Room {
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn participant(&self, user_name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_name == user_name)
    }

    pub fn host(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_host)
    }

    /// Replace the participant list, keeping the first entry for each id and
    /// ordering by draft position.
    pub fn set_participants(&mut self, participants: Vec<Participant>) {
        let mut seen = std::collections::HashSet::new();
        let mut unique: Vec<Participant> = participants
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect();
        unique.sort_by_key(|p| p.draft_position);
        self.participants = unique;
    }
}
