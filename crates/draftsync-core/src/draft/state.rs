// Draft state: room, pick history, available pool, my roster, turn, timer.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use super::pick::Pick;
use super::player::Player;
use super::room::{Participant, Room, RoomStatus};

/// The local projection of a draft session.
///
/// Fields are private; the only writer is the reducer in
/// [`crate::sync::reducer`], which keeps these invariants after every event:
///
/// 1. no available player appears in the pick history,
/// 2. picks are strictly increasing by pick number,
/// 3. `my_team` is exactly the players of picks made by `me`, in order,
/// 4. "is it my turn" is always derived from `current_turn`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DraftState {
    me: String,
    room: Option<Room>,
    picks: Vec<Pick>,
    available_players: Vec<Player>,
    my_team: Vec<Player>,
    current_turn: Option<String>,
    timer_seconds: Option<u32>,
    /// Final rosters by user name, delivered with `draft_complete`.
    final_teams: Option<BTreeMap<String, Vec<Player>>>,
}

impl DraftState {
    /// Empty state for the local user `me`; no room until the first sync.
    pub fn new(me: impl Into<String>) -> Self {
        DraftState {
            me: me.into(),
            ..DraftState::default()
        }
    }

    /// Initial state built from a bootstrap room (e.g. the REST join
    /// response), before any WebSocket sync.
    pub fn from_room(me: impl Into<String>, room: Room) -> Self {
        DraftState {
            me: me.into(),
            room: Some(room),
            ..DraftState::default()
        }
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn status(&self) -> Option<RoomStatus> {
        self.room.as_ref().map(|r| r.status)
    }

    pub fn picks(&self) -> &[Pick] {
        &self.picks
    }

    pub fn available_players(&self) -> &[Player] {
        &self.available_players
    }

    pub fn my_team(&self) -> &[Player] {
        &self.my_team
    }

    pub fn current_turn(&self) -> Option<&str> {
        self.current_turn.as_deref()
    }

    pub fn timer_seconds(&self) -> Option<u32> {
        self.timer_seconds
    }

    pub fn final_teams(&self) -> Option<&BTreeMap<String, Vec<Player>>> {
        self.final_teams.as_ref()
    }

    /// True when the server says it is the local user's turn.
    pub fn is_my_turn(&self) -> bool {
        self.current_turn.as_deref() == Some(self.me.as_str())
    }

    pub fn is_available(&self, player_id: &str) -> bool {
        self.available_players.iter().any(|p| p.id == player_id)
    }

    pub fn available_player(&self, player_id: &str) -> Option<&Player> {
        self.available_players.iter().find(|p| p.id == player_id)
    }

    pub fn last_pick_number(&self) -> Option<u32> {
        self.picks.last().map(|p| p.pick_number)
    }

    /// Verify the state invariants, returning a description of the first
    /// violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let picked: HashSet<&str> = self.picks.iter().map(|p| p.player.id.as_str()).collect();
        if let Some(p) = self
            .available_players
            .iter()
            .find(|p| picked.contains(p.id.as_str()))
        {
            return Err(format!("player {} is both picked and available", p.id));
        }

        for pair in self.picks.windows(2) {
            if pair[1].pick_number <= pair[0].pick_number {
                return Err(format!(
                    "pick numbers not strictly increasing: {} then {}",
                    pair[0].pick_number, pair[1].pick_number
                ));
            }
        }

        let expected: Vec<&Player> = self
            .picks
            .iter()
            .filter(|p| p.user_name == self.me)
            .map(|p| &p.player)
            .collect();
        let actual: Vec<&Player> = self.my_team.iter().collect();
        if expected != actual {
            return Err(format!(
                "my_team has {} players, pick history implies {}",
                actual.len(),
                expected.len()
            ));
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mutation helpers, driven only by the reducer.
    // -----------------------------------------------------------------------

    /// Replace room, picks, and pool wholesale from a snapshot, normalizing
    /// so the invariants hold even if the snapshot is inconsistent.
    ///
    /// The snapshot carries no turn, timer, or rosters, so whatever the
    /// previous connection left behind is dropped; the next `draft_started`,
    /// `pick_made`, or `timer_tick` repopulates them.
    pub(crate) fn restore_from_snapshot(
        &mut self,
        mut room: Room,
        participants: Option<Vec<Participant>>,
        mut picks: Vec<Pick>,
        available: Vec<Player>,
    ) {
        if let Some(list) = participants {
            room.set_participants(list);
        }

        let received = picks.len();
        picks.sort_by_key(|p| p.pick_number);
        picks.dedup_by_key(|p| p.pick_number);
        if picks.len() != received {
            warn!(
                "Snapshot contained {} duplicate pick number(s); kept first of each",
                received - picks.len()
            );
        }

        let picked: HashSet<String> = picks.iter().map(|p| p.player.id.clone()).collect();
        let mut seen = HashSet::new();
        let offered = available.len();
        let available: Vec<Player> = available
            .into_iter()
            .filter(|p| !picked.contains(&p.id) && seen.insert(p.id.clone()))
            .collect();
        if available.len() != offered {
            warn!(
                "Snapshot pool had {} duplicate or already-picked player(s); removed",
                offered - available.len()
            );
        }

        self.room = Some(room);
        self.picks = picks;
        self.available_players = available;
        self.current_turn = None;
        self.timer_seconds = None;
        self.final_teams = None;
        self.recompute_my_team();
    }

    /// Append a pick and move the player out of the pool.
    pub(crate) fn record_pick(&mut self, pick: Pick) {
        self.available_players.retain(|p| p.id != pick.player.id);
        if pick.user_name == self.me {
            self.my_team.push(pick.player.clone());
        }
        if let Some(room) = self.room.as_mut() {
            room.current_pick = pick.pick_number;
        }
        self.picks.push(pick);
    }

    pub(crate) fn set_participants(&mut self, participants: Vec<Participant>) -> bool {
        match self.room.as_mut() {
            Some(room) => {
                room.set_participants(participants);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_status(&mut self, status: RoomStatus) {
        if let Some(room) = self.room.as_mut() {
            room.status = status;
        }
    }

    pub(crate) fn set_current_turn(&mut self, turn: Option<String>) {
        self.current_turn = turn;
    }

    pub(crate) fn set_timer(&mut self, seconds: Option<u32>) {
        self.timer_seconds = seconds;
    }

    /// Store the final rosters and retire every rostered player from the
    /// pool. The server announces the last pick only through these rosters,
    /// so that pick never reaches the history; `my_team` stays derived from
    /// the history and a disagreement is logged.
    pub(crate) fn set_final_teams(&mut self, teams: BTreeMap<String, Vec<Player>>) {
        let before = self.available_players.len();
        {
            let rostered: HashSet<&str> =
                teams.values().flatten().map(|p| p.id.as_str()).collect();
            self.available_players
                .retain(|p| !rostered.contains(p.id.as_str()));
        }
        if self.available_players.len() != before {
            debug!(
                "Final rosters retired {} player(s) never seen as picks",
                before - self.available_players.len()
            );
        }

        let (listed, mismatch) = {
            let final_roster: HashSet<&str> = teams
                .get(&self.me)
                .map(|team| team.iter().map(|p| p.id.as_str()).collect())
                .unwrap_or_default();
            let recorded: HashSet<&str> = self.my_team.iter().map(|p| p.id.as_str()).collect();
            (final_roster.len(), (final_roster != recorded).then_some(recorded.len()))
        };
        if let Some(recorded) = mismatch {
            warn!(
                "Final roster for {} has {listed} player(s) but {recorded} pick(s) were recorded locally",
                self.me
            );
        }

        self.final_teams = Some(teams);
    }

    fn recompute_my_team(&mut self) {
        self.my_team = self
            .picks
            .iter()
            .filter(|p| p.user_name == self.me)
            .map(|p| p.player.clone())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::player::Position;
    use chrono::Utc;

    fn player(id: &str) -> Player {
        Player::new(id, format!("Player {id}"), "FA", Position::WR, 100.0)
    }

    fn room() -> Room {
        Room {
            id: "r1".into(),
            name: "Test".into(),
            code: "ABCDEF".into(),
            status: RoomStatus::Drafting,
            current_pick: 0,
            total_rounds: 3,
            turn_time_sec: 30,
            participants: vec![],
        }
    }

    fn pick(n: u32, user: &str, id: &str) -> Pick {
        Pick::new(n, user, player(id), Utc::now())
    }

    #[test]
    fn new_state_has_no_room() {
        let state = DraftState::new("alice");
        assert!(state.room().is_none());
        assert!(state.status().is_none());
        assert!(!state.is_my_turn());
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn is_my_turn_follows_current_turn() {
        let mut state = DraftState::new("alice");
        state.set_current_turn(Some("bob".into()));
        assert!(!state.is_my_turn());
        state.set_current_turn(Some("alice".into()));
        assert!(state.is_my_turn());
        state.set_current_turn(None);
        assert!(!state.is_my_turn());
    }

    #[test]
    fn record_pick_moves_player_and_tracks_my_team() {
        let mut state = DraftState::from_room("alice", room());
        state.restore_from_snapshot(room(), None, vec![], vec![player("a"), player("b")]);

        state.record_pick(pick(1, "alice", "a"));
        state.record_pick(pick(2, "bob", "b"));

        assert_eq!(state.picks().len(), 2);
        assert!(state.available_players().is_empty());
        assert_eq!(state.my_team().len(), 1);
        assert_eq!(state.my_team()[0].id, "a");
        assert_eq!(state.room().unwrap().current_pick, 2);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn snapshot_is_normalized() {
        let mut state = DraftState::new("alice");
        state.restore_from_snapshot(
            room(),
            None,
            vec![pick(2, "bob", "b"), pick(1, "alice", "a"), pick(2, "bob", "x")],
            vec![player("a"), player("c"), player("c"), player("d")],
        );

        let numbers: Vec<u32> = state.picks().iter().map(|p| p.pick_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        let pool: Vec<&str> = state.available_players().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(pool, vec!["c", "d"]);
        assert_eq!(state.my_team().len(), 1);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn snapshot_participants_override_room_list() {
        let mut state = DraftState::new("alice");
        let seat = Participant {
            id: "u1".into(),
            user_name: "alice".into(),
            draft_position: 1,
            is_host: true,
        };
        state.restore_from_snapshot(room(), Some(vec![seat]), vec![], vec![]);
        assert_eq!(state.room().unwrap().participant_count(), 1);
    }

    #[test]
    fn check_invariants_reports_violations() {
        let mut state = DraftState::new("alice");
        state.available_players = vec![player("a")];
        state.picks = vec![pick(1, "bob", "a")];
        assert!(state.check_invariants().is_err());

        let mut state = DraftState::new("alice");
        state.picks = vec![pick(2, "bob", "a"), pick(2, "bob", "b")];
        assert!(state.check_invariants().is_err());

        let mut state = DraftState::new("alice");
        state.picks = vec![pick(1, "alice", "a")];
        assert!(state.check_invariants().is_err());
    }

    #[test]
    fn snapshot_drops_turn_timer_and_rosters() {
        let mut state = DraftState::from_room("alice", room());
        state.set_current_turn(Some("alice".into()));
        state.set_timer(Some(9));
        let mut teams = BTreeMap::new();
        teams.insert("alice".to_string(), vec![player("a")]);
        state.set_final_teams(teams);

        state.restore_from_snapshot(room(), None, vec![], vec![player("a")]);

        assert_eq!(state.current_turn(), None);
        assert!(!state.is_my_turn());
        assert_eq!(state.timer_seconds(), None);
        assert!(state.final_teams().is_none());
        assert_eq!(state, {
            let mut fresh = DraftState::new("alice");
            fresh.restore_from_snapshot(room(), None, vec![], vec![player("a")]);
            fresh
        });
    }
}
