// State reducer: applies one server event to the prior draft state.

use chrono::{DateTime, Utc};

use crate::draft::{DraftState, Pick, RoomStatus};
use crate::error::{ProtocolError, SyncError};
use crate::protocol::ServerEvent;

/// What happened when an event was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The event changed (or confirmed) the state.
    Applied,
    /// A `pick_made` was appended to the history.
    PickRecorded {
        pick_number: u32,
        user: String,
        player_id: String,
    },
    /// Duplicate or superseded delivery; state unchanged.
    Stale { reason: String },
    /// Not applied; state unchanged, diagnostic for the caller.
    Rejected(SyncError),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied | Outcome::PickRecorded { .. })
    }
}

/// Apply `event` to `state`, returning the next state and what happened.
///
/// Never panics. When the outcome is `Stale` or `Rejected` the returned state
/// is identical to the input.
pub fn apply(
    mut state: DraftState,
    event: ServerEvent,
    received_at: DateTime<Utc>,
) -> (DraftState, Outcome) {
    let kind = event.kind();
    let outcome = match event {
        ServerEvent::Sync {
            room,
            picks,
            available_players,
            participants,
        } => {
            state.restore_from_snapshot(room, participants, picks, available_players);
            Outcome::Applied
        }

        ServerEvent::UserJoined { participants, .. } | ServerEvent::UserLeft { participants, .. } => {
            if state.set_participants(participants) {
                Outcome::Applied
            } else {
                reject(ProtocolError::NoRoom { kind })
            }
        }

        ServerEvent::DraftStarted { current_turn } => match state.status() {
            Some(status) if !status.can_transition_to(RoomStatus::Drafting) => {
                reject(ProtocolError::InvalidTransition { kind, status })
            }
            _ => {
                state.set_status(RoomStatus::Drafting);
                state.set_current_turn(current_turn);
                Outcome::Applied
            }
        },

        ServerEvent::PickMade {
            pick_number,
            user,
            player,
            next_turn,
        } => match state.status() {
            None => reject(ProtocolError::NoRoom { kind }),
            Some(status) if status != RoomStatus::Drafting => {
                reject(ProtocolError::InvalidTransition { kind, status })
            }
            Some(_) if !state.is_available(&player.id) => Outcome::Stale {
                reason: format!("player {} is no longer available", player.id),
            },
            Some(_) if state.last_pick_number().is_some_and(|last| pick_number <= last) => {
                Outcome::Stale {
                    reason: format!(
                        "pick #{pick_number} is not after pick #{}",
                        state.last_pick_number().unwrap_or_default()
                    ),
                }
            }
            Some(_) => {
                let player_id = player.id.clone();
                state.record_pick(Pick::new(pick_number, user.clone(), player, received_at));
                state.set_current_turn(next_turn);
                Outcome::PickRecorded {
                    pick_number,
                    user,
                    player_id,
                }
            }
        },

        ServerEvent::TimerTick { seconds_left } => {
            state.set_timer(Some(seconds_left));
            Outcome::Applied
        }

        ServerEvent::DraftComplete { teams } => match state.status() {
            None => reject(ProtocolError::NoRoom { kind }),
            Some(status) if !status.can_transition_to(RoomStatus::Completed) => {
                reject(ProtocolError::InvalidTransition { kind, status })
            }
            Some(_) => {
                state.set_status(RoomStatus::Completed);
                state.set_timer(None);
                state.set_current_turn(None);
                if let Some(teams) = teams {
                    state.set_final_teams(teams);
                }
                Outcome::Applied
            }
        },

        ServerEvent::Error { message } => Outcome::Rejected(SyncError::Server { message }),

        ServerEvent::Unknown => reject(ProtocolError::UnknownKind {
            kind: kind.to_string(),
        }),
    };

    debug_assert!(
        state.check_invariants().is_ok(),
        "invariant broken after {kind}: {:?}",
        state.check_invariants()
    );

    (state, outcome)
}

fn reject(err: ProtocolError) -> Outcome {
    Outcome::Rejected(SyncError::Protocol(err))
}
