use serde::{Deserialize, Serialize};

use super::state::Side;

/// Playback settings, read once at session start.
///
/// Every field has a serde default so a partial `[timer]` table (or none at
/// all) still yields a usable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    /// Pre-exercise countdown start value. 0 starts exercises immediately.
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u32,
    /// Rest between sets (and between the two sides of a unilateral set)
    /// when the exercise does not override it.
    #[serde(default = "default_rest_between_sets_secs")]
    pub rest_between_sets_secs: u32,
    /// Length of the `preparing` phase between exercises under auto-advance.
    #[serde(default = "default_pause_between_exercises_secs")]
    pub pause_between_exercises_secs: u32,
    #[serde(default = "default_starting_side")]
    pub starting_side: Side,
    #[serde(default = "default_true")]
    pub rest_cues_enabled: bool,
    #[serde(default = "default_true")]
    pub lead_in_cues_enabled: bool,
    /// Seconds per rep when neither the session nor the exercise says.
    #[serde(default = "default_rep_duration_secs")]
    pub default_rep_duration_secs: u32,
}

fn default_countdown_secs() -> u32 {
    3
}
fn default_rest_between_sets_secs() -> u32 {
    30
}
fn default_pause_between_exercises_secs() -> u32 {
    5
}
fn default_starting_side() -> Side {
    Side::Left
}
fn default_true() -> bool {
    true
}
fn default_rep_duration_secs() -> u32 {
    3
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            countdown_secs: default_countdown_secs(),
            rest_between_sets_secs: default_rest_between_sets_secs(),
            pause_between_exercises_secs: default_pause_between_exercises_secs(),
            starting_side: default_starting_side(),
            rest_cues_enabled: true,
            lead_in_cues_enabled: true,
            default_rep_duration_secs: default_rep_duration_secs(),
        }
    }
}

impl TimerSettings {
    /// The side unilateral and alternating exercises begin on.
    ///
    /// `Side::None` is not a valid preference and falls back to left.
    pub fn first_side(&self) -> Side {
        match self.starting_side {
            Side::None => Side::Left,
            side => side,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: TimerSettings = toml::from_str("countdown_secs = 5").unwrap();
        assert_eq!(parsed.countdown_secs, 5);
        assert_eq!(parsed.rest_between_sets_secs, 30);
        assert_eq!(parsed.starting_side, Side::Left);
        assert!(parsed.rest_cues_enabled);
    }

    #[test]
    fn none_is_not_a_starting_side() {
        let settings = TimerSettings {
            starting_side: Side::None,
            ..TimerSettings::default()
        };
        assert_eq!(settings.first_side(), Side::Left);
    }
}
