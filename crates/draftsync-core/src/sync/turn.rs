// Turn calculator: pick and round numbers derived from the draft state.

use serde::Serialize;

use crate::draft::DraftState;

/// Derived turn bookkeeping for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TurnInfo {
    /// Picks in the whole draft: rounds x participants.
    pub total_picks: u32,
    /// Picks made so far.
    pub picks_made: u32,
    /// 1-based round the next pick belongs to.
    pub round: u32,
    /// 1-based number of the next pick.
    pub display_pick: u32,
    pub picks_remaining: u32,
}

impl TurnInfo {
    /// Compute turn info from the current state.
    ///
    /// The locally observed pick history is the count of record; the room's
    /// `current_pick` is only consulted before any pick has been seen here
    /// (e.g. right after `draft_started`).
    pub fn from_state(state: &DraftState) -> Self {
        let Some(room) = state.room() else {
            return TurnInfo::default();
        };

        let seats = (room.participant_count() as u32).max(1);
        let total_picks = room.total_rounds.saturating_mul(seats);

        let picks_made = if state.picks().is_empty() {
            room.current_pick
        } else {
            state.picks().len() as u32
        };

        let mut round = (picks_made / seats).saturating_add(1);
        if room.total_rounds > 0 {
            round = round.min(room.total_rounds);
        }

        TurnInfo {
            total_picks,
            picks_made,
            round,
            display_pick: picks_made.saturating_add(1),
            picks_remaining: total_picks.saturating_sub(picks_made),
        }
    }

    pub fn is_final_round(&self, total_rounds: u32) -> bool {
        self.round >= total_rounds
    }
}
