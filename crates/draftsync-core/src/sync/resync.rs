// Reconnect resync: a snapshot barrier that supersedes everything queued
// between a disconnect and the next `sync`.

use serde::Serialize;
use tracing::{debug, info};

use crate::protocol::{ClientIntent, ServerEvent};

/// Whether incoming events can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// A snapshot has been applied and no disconnect seen since.
    Live,
    /// Waiting for a `sync` barrier; everything else is discarded.
    AwaitingResync,
}

/// What to do with an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Apply in arrival order.
    Apply,
    /// A snapshot: apply it, replacing all prior state.
    Barrier,
    /// Arrived while awaiting a barrier; drop unapplied.
    Discard,
}

/// Gate in front of the reducer enforcing barrier ordering.
///
/// Starts out awaiting a snapshot, since nothing is trusted before the
/// first `sync`.
#[derive(Debug, Clone)]
pub struct ResyncGate {
    status: SyncStatus,
    discarded: usize,
    barriers: u64,
}

impl Default for ResyncGate {
    fn default() -> Self {
        ResyncGate::new()
    }
}

impl ResyncGate {
    pub fn new() -> Self {
        ResyncGate {
            status: SyncStatus::AwaitingResync,
            discarded: 0,
            barriers: 0,
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn is_awaiting(&self) -> bool {
        self.status == SyncStatus::AwaitingResync
    }

    /// Events dropped while waiting for the current barrier.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Barriers applied over the life of the session.
    pub fn barriers(&self) -> u64 {
        self.barriers
    }

    /// The connection dropped. Returns `true` if this moved the gate out of
    /// the live state.
    pub fn on_connection_lost(&mut self) -> bool {
        let was_live = self.status == SyncStatus::Live;
        self.status = SyncStatus::AwaitingResync;
        if was_live {
            info!("Connection lost; awaiting resync snapshot");
        }
        was_live
    }

    /// The transport reconnected. Returns the snapshot request to send.
    pub fn on_reconnected(&mut self) -> ClientIntent {
        self.status = SyncStatus::AwaitingResync;
        info!("Reconnected; requesting resync snapshot");
        ClientIntent::Sync
    }

    /// Decide whether `event` may reach the reducer.
    pub fn admit(&mut self, event: &ServerEvent) -> Admission {
        if event.is_barrier() {
            if self.discarded > 0 {
                info!(
                    "Resync barrier arrived; {} event(s) discarded while waiting",
                    self.discarded
                );
            }
            self.status = SyncStatus::Live;
            self.discarded = 0;
            self.barriers += 1;
            return Admission::Barrier;
        }

        match self.status {
            SyncStatus::Live => Admission::Apply,
            SyncStatus::AwaitingResync => {
                self.discarded += 1;
                debug!("Discarding `{}` while awaiting resync", event.kind());
                Admission::Discard
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{Room, RoomStatus};

    fn snapshot() -> ServerEvent {
        ServerEvent::Sync {
            room: Room {
                id: "r".into(),
                name: "n".into(),
                code: "c".into(),
                status: RoomStatus::Waiting,
                current_pick: 0,
                total_rounds: 1,
                turn_time_sec: 0,
                participants: vec![],
            },
            picks: vec![],
            available_players: vec![],
            participants: None,
        }
    }

    fn tick() -> ServerEvent {
        ServerEvent::TimerTick { seconds_left: 3 }
    }

    #[test]
    fn nothing_applies_before_first_snapshot() {
        let mut gate = ResyncGate::new();
        assert_eq!(gate.admit(&tick()), Admission::Discard);
        assert_eq!(gate.discarded(), 1);
        assert_eq!(gate.admit(&snapshot()), Admission::Barrier);
        assert_eq!(gate.status(), SyncStatus::Live);
        assert_eq!(gate.discarded(), 0);
        assert_eq!(gate.admit(&tick()), Admission::Apply);
    }

    #[test]
    fn disconnect_discards_until_barrier() {
        let mut gate = ResyncGate::new();
        gate.admit(&snapshot());
        assert!(gate.on_connection_lost());
        assert!(!gate.on_connection_lost());
        assert_eq!(gate.on_reconnected(), ClientIntent::Sync);
        assert_eq!(gate.admit(&tick()), Admission::Discard);
        assert_eq!(gate.admit(&tick()), Admission::Discard);
        assert_eq!(gate.discarded(), 2);
        assert_eq!(gate.admit(&snapshot()), Admission::Barrier);
        assert_eq!(gate.barriers(), 2);
        assert!(!gate.is_awaiting());
    }

    #[test]
    fn snapshot_while_live_is_still_a_barrier() {
        let mut gate = ResyncGate::new();
        gate.admit(&snapshot());
        assert_eq!(gate.admit(&snapshot()), Admission::Barrier);
    }
}
