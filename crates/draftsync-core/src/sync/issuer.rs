// Pick issuer: local precondition checks and the pending-pick guard.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::draft::{DraftState, RoomStatus};
use crate::error::{InvalidPickError, PickError, SyncError};
use crate::protocol::ClientIntent;
use crate::transport::IntentSink;

/// Extra time allowed on top of the room's turn timer before an unconfirmed
/// pick is considered lost.
pub const DEFAULT_PICK_GRACE: Duration = Duration::from_secs(5);

/// A pick intent that has been sent but not yet confirmed by `pick_made`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPick {
    pub player_id: String,
    pub issued_at: Instant,
    pub deadline: Instant,
}

/// Issues pick intents and guards against re-submission while one is in
/// flight. Never mutates [`DraftState`]; the only way a pick lands in the
/// state is the server's `pick_made` event.
#[derive(Debug, Clone)]
pub struct PickIssuer {
    grace: Duration,
    pending: Option<PendingPick>,
}

impl Default for PickIssuer {
    fn default() -> Self {
        PickIssuer::new(DEFAULT_PICK_GRACE)
    }
}

impl PickIssuer {
    pub fn new(grace: Duration) -> Self {
        PickIssuer {
            grace,
            pending: None,
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn pending(&self) -> Option<&PendingPick> {
        self.pending.as_ref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Check every local precondition for picking `player_id`.
    pub fn validate(
        &self,
        state: &DraftState,
        player_id: &str,
        awaiting_resync: bool,
    ) -> Result<(), InvalidPickError> {
        if let Some(pending) = &self.pending {
            return Err(InvalidPickError::RequestPending {
                player_id: pending.player_id.clone(),
            });
        }
        if awaiting_resync {
            return Err(InvalidPickError::AwaitingResync);
        }
        if state.status() != Some(RoomStatus::Drafting) {
            return Err(InvalidPickError::DraftNotActive);
        }
        if !state.is_my_turn() {
            return Err(InvalidPickError::NotMyTurn {
                current_turn: state.current_turn().map(String::from),
            });
        }
        if !state.is_available(player_id) {
            return Err(InvalidPickError::PlayerUnavailable {
                player_id: player_id.to_string(),
            });
        }
        Ok(())
    }

    /// Validate, send one pick intent through `sink`, and arm the guard.
    ///
    /// On any failure nothing is armed; on a precondition failure nothing is
    /// sent either.
    pub fn request<S: IntentSink + ?Sized>(
        &mut self,
        state: &DraftState,
        player_id: &str,
        sink: &S,
        now: Instant,
        awaiting_resync: bool,
    ) -> Result<(), PickError> {
        self.validate(state, player_id, awaiting_resync)?;

        let turn_time = state
            .room()
            .map(|r| Duration::from_secs(u64::from(r.turn_time_sec)))
            .unwrap_or_default();

        sink.send_intent(ClientIntent::Pick {
            player_id: player_id.to_string(),
        })?;

        let deadline = now + turn_time + self.grace;
        info!(
            "Pick intent sent for player {} (confirm within {:?})",
            player_id,
            turn_time + self.grace
        );
        self.pending = Some(PendingPick {
            player_id: player_id.to_string(),
            issued_at: now,
            deadline,
        });
        Ok(())
    }

    /// A `pick_made` was applied; the turn has advanced, so whatever we were
    /// waiting on is settled.
    pub fn confirm(&mut self, recorded_player_id: &str) -> Option<PendingPick> {
        let pending = self.pending.take()?;
        if pending.player_id == recorded_player_id {
            debug!("Pending pick {} confirmed", pending.player_id);
        } else {
            warn!(
                "Turn advanced with player {} while our pick {} was pending",
                recorded_player_id, pending.player_id
            );
        }
        Some(pending)
    }

    /// A snapshot barrier was applied. Drop the guard if the snapshot makes
    /// the pending pick moot (player gone or no longer our turn).
    pub fn reconcile_snapshot(&mut self, state: &DraftState) -> Option<PendingPick> {
        let moot = match &self.pending {
            Some(p) => !state.is_available(&p.player_id) || !state.is_my_turn(),
            None => false,
        };
        if moot {
            let cleared = self.pending.take();
            debug!("Snapshot settled pending pick {:?}", cleared);
            cleared
        } else {
            None
        }
    }

    /// Clear the guard if its deadline has passed, returning the timeout
    /// diagnostic for the caller.
    pub fn expire(&mut self, now: Instant) -> Option<SyncError> {
        let expired = self.pending.as_ref().is_some_and(|p| now >= p.deadline);
        if !expired {
            return None;
        }
        let pending = self.pending.take()?;
        let waited = now.saturating_duration_since(pending.issued_at);
        warn!(
            "Pick for player {} not confirmed after {:?}; guard cleared",
            pending.player_id, waited
        );
        Some(SyncError::RequestTimeout {
            player_id: pending.player_id,
            waited,
        })
    }
}
