//! Audio/haptic cue seam.
//!
//! The engine decides which cue fires and when; rendering the tone or
//! vibration is up to whatever implements [`CuePlayer`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCue {
    CountdownTick,
    DurationStart,
    DurationEnd,
    RepStart,
    RepEnd,
    RestStart,
    RestEnd,
    SwitchSides,
    SessionComplete,
}

impl AudioCue {
    pub fn label(self) -> &'static str {
        match self {
            AudioCue::CountdownTick => "tick",
            AudioCue::DurationStart => "start",
            AudioCue::DurationEnd => "done",
            AudioCue::RepStart => "rep",
            AudioCue::RepEnd => "rep end",
            AudioCue::RestStart => "rest",
            AudioCue::RestEnd => "rest over",
            AudioCue::SwitchSides => "switch sides",
            AudioCue::SessionComplete => "session complete",
        }
    }
}

/// Plays cues. Calls are fire-and-forget and must not block.
pub trait CuePlayer {
    fn countdown_tick(&mut self);
    fn duration_start(&mut self);
    fn duration_end(&mut self);
    fn rep_start(&mut self);
    fn rep_end(&mut self);
    fn rest_start(&mut self);
    fn rest_end(&mut self);
    fn switch_sides(&mut self);
    fn session_complete(&mut self);
}

/// Route a cue to the matching player method.
pub fn play_cue<P: CuePlayer + ?Sized>(player: &mut P, cue: AudioCue) {
    match cue {
        AudioCue::CountdownTick => player.countdown_tick(),
        AudioCue::DurationStart => player.duration_start(),
        AudioCue::DurationEnd => player.duration_end(),
        AudioCue::RepStart => player.rep_start(),
        AudioCue::RepEnd => player.rep_end(),
        AudioCue::RestStart => player.rest_start(),
        AudioCue::RestEnd => player.rest_end(),
        AudioCue::SwitchSides => player.switch_sides(),
        AudioCue::SessionComplete => player.session_complete(),
    }
}

/// Player that discards every cue.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCuePlayer;

impl CuePlayer for NullCuePlayer {
    fn countdown_tick(&mut self) {}
    fn duration_start(&mut self) {}
    fn duration_end(&mut self) {}
    fn rep_start(&mut self) {}
    fn rep_end(&mut self) {}
    fn rest_start(&mut self) {}
    fn rest_end(&mut self) {}
    fn switch_sides(&mut self) {}
    fn session_complete(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<&'static str>);

    impl CuePlayer for Recorder {
        fn countdown_tick(&mut self) {
            self.0.push("countdown_tick");
        }
        fn duration_start(&mut self) {
            self.0.push("duration_start");
        }
        fn duration_end(&mut self) {
            self.0.push("duration_end");
        }
        fn rep_start(&mut self) {
            self.0.push("rep_start");
        }
        fn rep_end(&mut self) {
            self.0.push("rep_end");
        }
        fn rest_start(&mut self) {
            self.0.push("rest_start");
        }
        fn rest_end(&mut self) {
            self.0.push("rest_end");
        }
        fn switch_sides(&mut self) {
            self.0.push("switch_sides");
        }
        fn session_complete(&mut self) {
            self.0.push("session_complete");
        }
    }

    #[test]
    fn every_cue_maps_to_its_own_method() {
        let cues = [
            AudioCue::CountdownTick,
            AudioCue::DurationStart,
            AudioCue::DurationEnd,
            AudioCue::RepStart,
            AudioCue::RepEnd,
            AudioCue::RestStart,
            AudioCue::RestEnd,
            AudioCue::SwitchSides,
            AudioCue::SessionComplete,
        ];
        let mut recorder = Recorder::default();
        for cue in cues {
            play_cue(&mut recorder, cue);
        }
        let expected: Vec<String> = cues
            .iter()
            .map(|c| serde_json::to_value(c).unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(recorder.0, expected);
    }
}
