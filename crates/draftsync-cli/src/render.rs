//! Plain-text rendering of projections and room summaries.

use std::collections::BTreeMap;

use draftsync_core::draft::{DraftState, Pick, Player, Room, RoomStatus};
use draftsync_core::session::Projection;
use draftsync_core::sync::resync::SyncStatus;

/// One-line status for the watch view. Excludes the countdown so that the
/// line only changes when something other than the clock moves.
pub fn status_line(p: &Projection) -> String {
    let Some(room) = p.state.room() else {
        return "waiting for room snapshot...".to_string();
    };

    let mut line = format!("[{}] {}", room.status, room.name);
    if room.status == RoomStatus::Drafting {
        line.push_str(&format!(
            " | round {}/{} pick {}/{}",
            p.turn.round, room.total_rounds, p.turn.display_pick, p.turn.total_picks
        ));
        if room.total_rounds > 1 && p.turn.is_final_round(room.total_rounds) {
            line.push_str(" (final round)");
        }
        match p.state.current_turn() {
            Some(_) if p.is_my_turn => line.push_str(" | YOUR PICK"),
            Some(user) => line.push_str(&format!(" | on the clock: {user}")),
            None => {}
        }
    }
    if let Some(pending) = &p.pending_pick {
        line.push_str(&format!(" | pending: {pending}"));
    }
    if p.sync_status == SyncStatus::AwaitingResync {
        line.push_str(" | resyncing");
    }
    line
}

pub fn player_label(player: &Player) -> String {
    format!(
        "{} ({}, {}) {:.1} pts",
        player.name,
        player.position.display_str(),
        player.team,
        player.fantasy_pts
    )
}

pub fn pick_line(pick: &Pick) -> String {
    format!(
        "#{:>3}  {:<16} {}",
        pick.pick_number,
        pick.user_name,
        player_label(&pick.player)
    )
}

/// Low-time warning for the local user, if due.
pub fn clock_warning(p: &Projection) -> Option<String> {
    let countdown = p.countdown?;
    if !p.is_my_turn {
        return None;
    }
    if countdown.is_expired() {
        Some("time is up; the server picks next".to_string())
    } else {
        countdown.is_low().then(|| format!("{countdown} left to pick"))
    }
}

/// Top available players by projected points.
pub fn best_available(pool: &[Player], n: usize) -> Vec<String> {
    let mut players: Vec<&Player> = pool.iter().collect();
    players.sort_by(|a, b| b.fantasy_pts.total_cmp(&a.fantasy_pts));
    players
        .into_iter()
        .take(n)
        .map(|p| format!("  {:<10} {}", p.id, player_label(p)))
        .collect()
}

pub fn room_summary(room: &Room, picks: &[Pick]) -> String {
    let mut out = format!(
        "{} (code {}, id {})\nstatus: {}  rounds: {}  turn time: {}s\n",
        room.name, room.code, room.id, room.status, room.total_rounds, room.turn_time_sec
    );
    out.push_str("participants:\n");
    for p in &room.participants {
        let host = if p.is_host { " (host)" } else { "" };
        out.push_str(&format!("  {}. {}{}\n", p.draft_position, p.user_name, host));
    }
    if !picks.is_empty() {
        out.push_str("recent picks:\n");
        let start = picks.len().saturating_sub(5);
        for pick in &picks[start..] {
            out.push_str(&format!("  {}\n", pick_line(pick)));
        }
    }
    out
}

/// Final rosters, from the server if it sent them, otherwise rebuilt from
/// the local pick history.
pub fn final_rosters(state: &DraftState) -> String {
    let mut out = String::from("final rosters:\n");
    match state.final_teams() {
        Some(teams) => out.push_str(&rosters(teams)),
        None => {
            let mut users: Vec<&str> = Vec::new();
            for pick in state.picks() {
                if !users.contains(&pick.user_name.as_str()) {
                    users.push(&pick.user_name);
                }
            }
            for user in users {
                out.push_str(&format!("  {user}:\n"));
                for pick in state.picks().iter().filter(|p| p.user_name == user) {
                    out.push_str(&format!("    {}\n", player_label(&pick.player)));
                }
            }
        }
    }
    out
}

pub fn rosters(teams: &BTreeMap<String, Vec<Player>>) -> String {
    let mut out = String::new();
    for (user, players) in teams {
        out.push_str(&format!("  {user}:\n"));
        for player in players {
            out.push_str(&format!("    {}\n", player_label(player)));
        }
    }
    out
}

/// Turns successive projections into the lines worth printing: new picks,
/// status changes, clock warnings, and the final rosters once.
#[derive(Debug, Default)]
pub struct WatchView {
    seen_picks: usize,
    last_status: String,
    last_warning: Option<String>,
    shown_final: bool,
}

impl WatchView {
    pub fn update(&mut self, p: &Projection) -> Vec<String> {
        let mut out = Vec::new();

        let picks = p.state.picks();
        if picks.len() < self.seen_picks {
            out.push(format!("-- resynced: {} pick(s) on record", picks.len()));
        } else {
            out.extend(picks[self.seen_picks..].iter().map(pick_line));
        }
        self.seen_picks = picks.len();

        let status = status_line(p);
        if status != self.last_status {
            out.push(status.clone());
            self.last_status = status;
        }

        let warning = clock_warning(p);
        if let Some(w) = &warning {
            if self.last_warning.as_ref() != Some(w) {
                out.push(format!("!! {w}"));
            }
        }
        self.last_warning = warning;

        if !self.shown_final && p.state.status() == Some(RoomStatus::Completed) {
            out.push(final_rosters(&p.state));
            self.shown_final = true;
        }
        out
    }
}
