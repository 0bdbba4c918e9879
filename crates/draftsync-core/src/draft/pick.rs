// Individual pick records.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::player::Player;

/// One completed pick. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    /// 1-based position in the overall draft.
    pub pick_number: u32,
    pub user_name: String,
    /// Snapshot of the player at the time of the pick.
    pub player: Player,
    #[serde(deserialize_with = "deserialize_picked_at")]
    pub picked_at: DateTime<Utc>,
}

impl Pick {
    pub fn new(
        pick_number: u32,
        user_name: impl Into<String>,
        player: Player,
        picked_at: DateTime<Utc>,
    ) -> Self {
        Pick {
            pick_number,
            user_name: user_name.into(),
            player,
            picked_at,
        }
    }
}

/// Accept RFC 3339 timestamps as well as the naive ISO-8601 form the server
/// emits for database timestamps (no offset, treated as UTC).
fn deserialize_picked_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid pick timestamp: {raw}"))
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_rfc3339_timestamp() {
        let ts = parse_timestamp("2025-09-01T18:30:00+02:00").unwrap();
        assert_eq!(ts.hour(), 16);
    }

    #[test]
    fn parses_naive_timestamp_as_utc() {
        let ts = parse_timestamp("2025-09-01T18:30:00.123456").unwrap();
        assert_eq!(ts.day(), 1);
        assert_eq!(ts.hour(), 18);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn pick_deserializes_from_sync_payload() {
        let json = r#"{
            "pick_number": 1,
            "user_name": "alice",
            "player": {"id": "p1", "name": "CMC", "team": "SF", "position": "RB", "fantasy_pts": 390.2},
            "picked_at": "2025-09-01T18:30:00"
        }"#;
        let pick: Pick = serde_json::from_str(json).unwrap();
        assert_eq!(pick.pick_number, 1);
        assert_eq!(pick.player.id, "p1");
    }

    #[test]
    fn pick_rejects_garbage_timestamp() {
        let json = r#"{
            "pick_number": 1, "user_name": "alice",
            "player": {"id": "p1", "name": "CMC", "team": "SF", "position": "RB"},
            "picked_at": "not a time"
        }"#;
        assert!(serde_json::from_str::<Pick>(json).is_err());
    }
}
