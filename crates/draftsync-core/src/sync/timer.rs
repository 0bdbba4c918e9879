// Timer tracker: read-side view of the server-driven pick countdown.
//
// The countdown is only ever set from `timer_tick` payloads; nothing here
// extrapolates between ticks.

use std::fmt;

use serde::Serialize;

use crate::draft::DraftState;

/// At or below this many seconds the countdown is flagged as low.
pub const LOW_TIME_THRESHOLD_SECS: u32 = 10;

/// The last countdown value reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub seconds_left: u32,
}

impl Countdown {
    /// `None` before the first tick and after the draft completes.
    pub fn from_state(state: &DraftState) -> Option<Self> {
        state
            .timer_seconds()
            .map(|seconds_left| Countdown { seconds_left })
    }

    pub fn is_low(&self) -> bool {
        self.seconds_left <= LOW_TIME_THRESHOLD_SECS
    }

    pub fn is_expired(&self) -> bool {
        self.seconds_left == 0
    }
}

impl fmt::Display for Countdown {
    /// Formats as `m:ss`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.seconds_left / 60, self.seconds_left % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(Countdown { seconds_left: 90 }.to_string(), "1:30");
        assert_eq!(Countdown { seconds_left: 5 }.to_string(), "0:05");
        assert_eq!(Countdown { seconds_left: 0 }.to_string(), "0:00");
    }

    #[test]
    fn low_time_threshold() {
        assert!(Countdown { seconds_left: 10 }.is_low());
        assert!(!Countdown { seconds_left: 11 }.is_low());
        assert!(Countdown { seconds_left: 0 }.is_expired());
    }

    #[test]
    fn undefined_before_first_tick() {
        assert!(Countdown::from_state(&DraftState::new("me")).is_none());
    }
}
