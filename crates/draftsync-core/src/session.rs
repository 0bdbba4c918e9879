// Draft session: owns the synchronized state and is its single writer.
//
// Transport signals and user commands are serialized through one task
// (`run`), so the reducer is only ever invoked from one place, in arrival
// order. Readers subscribe to projections via a watch channel and to
// diagnostics via a broadcast channel.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::draft::DraftState;
use crate::error::{PickError, SyncError};
use crate::protocol::{self, ServerEvent};
use crate::sync::issuer::{PickIssuer, DEFAULT_PICK_GRACE};
use crate::sync::reducer::{self, Outcome};
use crate::sync::resync::{Admission, ResyncGate, SyncStatus};
use crate::sync::timer::Countdown;
use crate::sync::turn::TurnInfo;
use crate::transport::{IntentSink, TransportSignal};

/// Tunables for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub pick_grace: Duration,
    pub diagnostics_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            pick_grace: DEFAULT_PICK_GRACE,
            diagnostics_capacity: 64,
        }
    }
}

/// Read-only view handed to projection consumers after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub state: DraftState,
    pub is_my_turn: bool,
    pub turn: TurnInfo,
    pub countdown: Option<Countdown>,
    /// Player id of a sent but unconfirmed pick.
    pub pending_pick: Option<String>,
    pub sync_status: SyncStatus,
}

/// Commands accepted by [`run`].
#[derive(Debug)]
pub enum SessionCommand {
    Pick {
        player_id: String,
        reply: oneshot::Sender<Result<(), PickError>>,
    },
    Shutdown,
}

/// A participant's live view of one draft room.
pub struct DraftSession<S> {
    state: DraftState,
    gate: ResyncGate,
    issuer: PickIssuer,
    sink: S,
    projection_tx: watch::Sender<Projection>,
    diagnostics_tx: broadcast::Sender<SyncError>,
}

impl<S: IntentSink> DraftSession<S> {
    /// Create a session from an initial state (empty, or built from a
    /// bootstrap room). Nothing is trusted until the first `sync` arrives.
    pub fn new(initial: DraftState, sink: S, options: SessionOptions) -> Self {
        let gate = ResyncGate::new();
        let issuer = PickIssuer::new(options.pick_grace);
        let projection = build_projection(&initial, &gate, &issuer);
        let (projection_tx, _) = watch::channel(projection);
        let (diagnostics_tx, _) = broadcast::channel(options.diagnostics_capacity.max(1));

        DraftSession {
            state: initial,
            gate,
            issuer,
            sink,
            projection_tx,
            diagnostics_tx,
        }
    }

    pub fn state(&self) -> &DraftState {
        &self.state
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.gate.status()
    }

    pub fn projection(&self) -> Projection {
        build_projection(&self.state, &self.gate, &self.issuer)
    }

    /// Subscribe to projection updates. The receiver always holds the latest.
    pub fn subscribe(&self) -> watch::Receiver<Projection> {
        self.projection_tx.subscribe()
    }

    /// Subscribe to diagnostics (protocol errors, timeouts, server errors).
    pub fn diagnostics(&self) -> broadcast::Receiver<SyncError> {
        self.diagnostics_tx.subscribe()
    }

    /// Deadline of the pending pick, if one is in flight.
    pub fn pick_deadline(&self) -> Option<Instant> {
        self.issuer.deadline()
    }

    /// Apply one decoded server event, subject to the resync barrier.
    pub fn apply(&mut self, event: ServerEvent) {
        let kind = event.kind();
        let admission = self.gate.admit(&event);
        if admission == Admission::Discard {
            return;
        }

        let prior = std::mem::take(&mut self.state);
        let (next, outcome) = reducer::apply(prior, event, Utc::now());
        self.state = next;

        // Stale and rejected events leave the state as it was.
        let changed = outcome.is_applied();
        match outcome {
            Outcome::Applied => debug!("Applied `{kind}`"),
            Outcome::PickRecorded {
                pick_number,
                user,
                player_id,
            } => {
                info!("Pick #{pick_number}: {user} took {player_id}");
                self.issuer.confirm(&player_id);
            }
            Outcome::Stale { reason } => debug!("Ignoring stale `{kind}`: {reason}"),
            Outcome::Rejected(err) => {
                warn!("Dropped `{kind}`: {err}");
                self.emit(err);
            }
        }

        if admission == Admission::Barrier {
            info!(
                "Snapshot #{} applied: {} pick(s), {} available",
                self.gate.barriers(),
                self.state.picks().len(),
                self.state.available_players().len()
            );
            self.issuer.reconcile_snapshot(&self.state);
        }
        if changed || admission == Admission::Barrier {
            self.publish();
        }
    }

    /// Decode and apply one text frame. Undecodable frames become protocol
    /// diagnostics.
    pub fn handle_frame(&mut self, text: &str) {
        match protocol::decode(text) {
            Ok(event) => self.apply(event),
            Err(err) => {
                warn!("Dropped frame: {err}");
                self.emit(err.into());
            }
        }
    }

    pub fn handle_signal(&mut self, signal: TransportSignal) {
        match signal {
            TransportSignal::Connected { url } => {
                info!("Connected to {url}; waiting for snapshot");
            }
            TransportSignal::Disconnected => {
                if self.gate.on_connection_lost() {
                    self.emit(SyncError::ConnectionLost);
                }
                self.publish();
            }
            TransportSignal::Reconnected { url } => {
                info!("Reconnected to {url}");
                let request = self.gate.on_reconnected();
                if let Err(e) = self.sink.send_intent(request) {
                    warn!("Failed to request resync snapshot: {e}");
                }
                self.publish();
            }
            TransportSignal::Message(text) => self.handle_frame(&text),
        }
    }

    /// Ask the server to draft `player_id` for us.
    pub fn request_pick(&mut self, player_id: &str) -> Result<(), PickError> {
        self.request_pick_at(player_id, Instant::now())
    }

    pub fn request_pick_at(&mut self, player_id: &str, now: Instant) -> Result<(), PickError> {
        let awaiting = self.gate.is_awaiting();
        match self
            .issuer
            .request(&self.state, player_id, &self.sink, now, awaiting)
        {
            Ok(()) => {
                self.publish();
                Ok(())
            }
            Err(e) => {
                debug!("Pick request for {player_id} rejected: {e}");
                Err(e)
            }
        }
    }

    /// Expire the pending pick if its deadline has passed. The timeout is
    /// also broadcast as a diagnostic.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<SyncError> {
        let err = self.issuer.expire(now)?;
        self.emit(err.clone());
        self.publish();
        Some(err)
    }

    /// End the session, handing back the final state.
    pub fn teardown(self) -> DraftState {
        info!(
            "Session for {} torn down after {} pick(s)",
            self.state.me(),
            self.state.picks().len()
        );
        self.state
    }

    fn emit(&self, err: SyncError) {
        // No subscribers is fine.
        let _ = self.diagnostics_tx.send(err);
    }

    fn publish(&self) {
        self.projection_tx.send_replace(self.projection());
    }
}

fn build_projection(state: &DraftState, gate: &ResyncGate, issuer: &PickIssuer) -> Projection {
    Projection {
        state: state.clone(),
        is_my_turn: state.is_my_turn(),
        turn: TurnInfo::from_state(state),
        countdown: Countdown::from_state(state),
        pending_pick: issuer.pending().map(|p| p.player_id.clone()),
        sync_status: gate.status(),
    }
}

/// Run the session loop until the command channel asks for shutdown or the
/// transport goes away. Returns the final state.
pub async fn run<S: IntentSink>(
    mut session: DraftSession<S>,
    mut signals: mpsc::Receiver<TransportSignal>,
    mut commands: mpsc::Receiver<SessionCommand>,
) -> anyhow::Result<DraftState> {
    info!("Session event loop started for {}", session.state().me());

    loop {
        let deadline = session.pick_deadline();

        tokio::select! {
            signal = signals.recv() => match signal {
                Some(signal) => session.handle_signal(signal),
                None => {
                    info!("Transport channel closed, shutting down");
                    break;
                }
            },

            cmd = commands.recv() => match cmd {
                Some(SessionCommand::Pick { player_id, reply }) => {
                    let result = session.request_pick(&player_id);
                    let _ = reply.send(result);
                }
                Some(SessionCommand::Shutdown) | None => {
                    info!("Shutdown requested");
                    break;
                }
            },

            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                session.poll_timeout(Instant::now());
            }
        }
    }

    Ok(session.teardown())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{Participant, Player, Position, Room, RoomStatus};
    use crate::error::InvalidPickError;
    use crate::protocol::ClientIntent;

    fn room(turn_time_sec: u32) -> Room {
        Room {
            id: "r1".into(),
            name: "Test League".into(),
            code: "ABC123".into(),
            status: RoomStatus::Drafting,
            current_pick: 0,
            total_rounds: 2,
            turn_time_sec,
            participants: ["alice", "bob"]
                .iter()
                .enumerate()
                .map(|(i, name)| Participant {
                    id: format!("u{i}"),
                    user_name: name.to_string(),
                    draft_position: i as u32 + 1,
                    is_host: i == 0,
                })
                .collect(),
        }
    }

    fn frame(event: &ServerEvent) -> TransportSignal {
        TransportSignal::Message(serde_json::to_string(event).unwrap())
    }

    fn sync_frame(turn_time_sec: u32) -> TransportSignal {
        frame(&ServerEvent::Sync {
            room: room(turn_time_sec),
            picks: vec![],
            available_players: vec![
                Player::new("p1", "Josh Allen", "BUF", Position::QB, 390.0),
                Player::new("p2", "Bijan Robinson", "ATL", Position::RB, 300.0),
            ],
            participants: None,
        })
    }

    fn started_frame(turn: &str) -> TransportSignal {
        frame(&ServerEvent::DraftStarted {
            current_turn: Some(turn.into()),
        })
    }

    fn new_session() -> (
        DraftSession<mpsc::UnboundedSender<ClientIntent>>,
        mpsc::UnboundedReceiver<ClientIntent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = DraftSession::new(DraftState::new("alice"), tx, SessionOptions::default());
        (session, rx)
    }

    async fn pick(commands: &mpsc::Sender<SessionCommand>, id: &str) -> Result<(), PickError> {
        let (reply, rx) = oneshot::channel();
        commands
            .send(SessionCommand::Pick {
                player_id: id.into(),
                reply,
            })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn event_loop_handles_shutdown() {
        let (session, _intents) = new_session();
        let (_sig_tx, sig_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);

        let handle = tokio::spawn(run(session, sig_rx, cmd_rx));
        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();

        let state = handle.await.unwrap().unwrap();
        assert_eq!(state.me(), "alice");
    }

    #[tokio::test]
    async fn event_loop_exits_when_transport_closes() {
        let (session, _intents) = new_session();
        let (sig_tx, sig_rx) = mpsc::channel(16);
        let (_cmd_tx, cmd_rx) = mpsc::channel(16);

        let handle = tokio::spawn(run(session, sig_rx, cmd_rx));
        drop(sig_tx);
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn event_loop_publishes_projection_after_sync() {
        let (session, _intents) = new_session();
        let mut projections = session.subscribe();
        let (sig_tx, sig_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let handle = tokio::spawn(run(session, sig_rx, cmd_rx));

        sig_tx.send(sync_frame(30)).await.unwrap();
        sig_tx.send(started_frame("alice")).await.unwrap();

        let projection = projections
            .wait_for(|p| p.is_my_turn)
            .await
            .unwrap()
            .clone();
        assert_eq!(projection.sync_status, SyncStatus::Live);
        assert_eq!(projection.state.available_players().len(), 2);
        assert_eq!(projection.turn.total_picks, 4);
        assert_eq!(projection.turn.display_pick, 1);

        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn event_loop_rejects_pick_before_snapshot() {
        let (session, mut intents) = new_session();
        let (_sig_tx, sig_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let handle = tokio::spawn(run(session, sig_rx, cmd_rx));

        let err = pick(&cmd_tx, "p1").await.unwrap_err();
        assert!(matches!(
            err,
            PickError::Invalid(InvalidPickError::AwaitingResync)
        ));
        assert!(intents.try_recv().is_err());

        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        let _ = handle.await;
    }

    #[tokio::test(start_paused = true)]
    async fn event_loop_times_out_unconfirmed_pick() {
        let (session, mut intents) = new_session();
        let mut diagnostics = session.diagnostics();
        let (sig_tx, sig_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let handle = tokio::spawn(run(session, sig_rx, cmd_rx));

        sig_tx.send(sync_frame(30)).await.unwrap();
        sig_tx.send(started_frame("alice")).await.unwrap();

        pick(&cmd_tx, "p1").await.unwrap();
        assert_eq!(
            intents.recv().await.unwrap(),
            ClientIntent::Pick {
                player_id: "p1".into()
            }
        );

        let started = Instant::now();
        match diagnostics.recv().await.unwrap() {
            SyncError::RequestTimeout { player_id, .. } => assert_eq!(player_id, "p1"),
            other => panic!("expected RequestTimeout, got {:?}", other),
        }
        assert!(started.elapsed() >= Duration::from_secs(35) - Duration::from_millis(1));

        // Guard is cleared; the retry goes out.
        pick(&cmd_tx, "p1").await.unwrap();
        assert!(intents.recv().await.is_some());

        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        let _ = handle.await;
    }

    #[test]
    fn stale_and_rejected_events_do_not_notify_subscribers() {
        let (mut session, _intents) = new_session();
        session.handle_signal(sync_frame(30));
        session.handle_signal(started_frame("alice"));
        let pick = ServerEvent::PickMade {
            pick_number: 1,
            user: "alice".into(),
            player: Player::new("p1", "Josh Allen", "BUF", Position::QB, 390.0),
            next_turn: Some("bob".into()),
        };
        session.handle_signal(frame(&pick));

        let mut projections = session.subscribe();
        projections.mark_unchanged();

        // Duplicate delivery, an out-of-order pick number, a server error.
        session.handle_signal(frame(&pick));
        session.handle_signal(frame(&ServerEvent::PickMade {
            pick_number: 1,
            user: "bob".into(),
            player: Player::new("p2", "Bijan Robinson", "ATL", Position::RB, 300.0),
            next_turn: Some("alice".into()),
        }));
        session.handle_signal(frame(&ServerEvent::Error {
            message: "Not your turn".into(),
        }));
        assert!(!projections.has_changed().unwrap());
        assert_eq!(session.state().picks().len(), 1);

        session.handle_signal(frame(&ServerEvent::TimerTick { seconds_left: 12 }));
        assert!(projections.has_changed().unwrap());
    }

    #[tokio::test]
    async fn reconnect_requests_snapshot() {
        let (mut session, mut intents) = new_session();
        session.handle_signal(sync_frame(30));
        assert_eq!(session.sync_status(), SyncStatus::Live);

        let mut diagnostics = session.diagnostics();
        session.handle_signal(TransportSignal::Disconnected);
        assert_eq!(session.sync_status(), SyncStatus::AwaitingResync);
        assert_eq!(diagnostics.recv().await.unwrap(), SyncError::ConnectionLost);

        session.handle_signal(TransportSignal::Reconnected {
            url: "ws://test".into(),
        });
        assert_eq!(intents.try_recv().unwrap(), ClientIntent::Sync);
    }
}
