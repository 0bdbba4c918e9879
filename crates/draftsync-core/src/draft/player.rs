// Player pool entries and their fantasy positions.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Fantasy football positions a player can be drafted at.
///
/// Serializes as the canonical abbreviation; deserializes through
/// [`Position::from_str_pos`], so feeds that send "qb" or "DST" still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    DEF,
}

impl Position {
    /// Parse a position abbreviation, case-insensitively.
    ///
    /// Accepts "DST" and "D/ST" as aliases for team defense.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::QB),
            "RB" => Some(Position::RB),
            "WR" => Some(Position::WR),
            "TE" => Some(Position::TE),
            "K" => Some(Position::K),
            "DEF" | "DST" | "D/ST" => Some(Position::DEF),
            _ => None,
        }
    }

    /// Canonical display string ("QB", "DEF", ...).
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::K => "K",
            Position::DEF => "DEF",
        }
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Position::from_str_pos(&raw).ok_or_else(|| {
            serde::de::Error::unknown_variant(&raw, &["QB", "RB", "WR", "TE", "K", "DEF", "DST"])
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_str())
    }
}

/// A draftable player as sent by the server.
///
/// The stat fields are position dependent; a kicker carries `fg_made` and
/// `xp_made`, a defense carries `sacks` and `ints`, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub team: String,
    pub position: Position,
    #[serde(default)]
    pub fantasy_pts: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_yds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_td: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rush_yds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rush_td: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rec_yds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rec_td: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fg_made: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_made: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sacks: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ints: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Player {
    /// Build a player with no positional stats.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        team: impl Into<String>,
        position: Position,
        fantasy_pts: f64,
    ) -> Self {
        Player {
            id: id.into(),
            name: name.into(),
            team: team.into(),
            position,
            fantasy_pts,
            pass_yds: None,
            pass_td: None,
            rush_yds: None,
            rush_td: None,
            rec_yds: None,
            rec_td: None,
            fg_made: None,
            xp_made: None,
            sacks: None,
            ints: None,
            image_url: None,
        }
    }

    /// The headline stat line for this player's position, e.g. "4306 yds, 29 TD".
    ///
    /// Returns `None` when the server did not send the relevant fields.
    pub fn stat_line(&self) -> Option<String> {
        let (yds, td) = match self.position {
            Position::QB => (self.pass_yds, self.pass_td),
            Position::RB => (self.rush_yds, self.rush_td),
            Position::WR | Position::TE => (self.rec_yds, self.rec_td),
            Position::K => {
                return match (self.fg_made, self.xp_made) {
                    (Some(fg), Some(xp)) => Some(format!("{fg} FG, {xp} XP")),
                    (Some(fg), None) => Some(format!("{fg} FG")),
                    _ => None,
                };
            }
            Position::DEF => {
                return match (self.sacks, self.ints) {
                    (Some(s), Some(i)) => Some(format!("{s} sacks, {i} INT")),
                    (Some(s), None) => Some(format!("{s} sacks")),
                    _ => None,
                };
            }
        };
        match (yds, td) {
            (Some(y), Some(t)) => Some(format!("{y} yds, {t} TD")),
            (Some(y), None) => Some(format!("{y} yds")),
            _ => None,
        }
    }
}
