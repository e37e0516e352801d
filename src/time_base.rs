//! Battery / screen time base
//!
//! Decides which accumulator columns a delta lands in. Transitions only
//! affect deltas committed afterwards.

use serde::Serialize;

/// Accumulator column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    AllTime,
    ScreenOff,
}

impl Column {
    pub const COUNT: usize = 2;

    pub fn index(self) -> usize {
        match self {
            Column::AllTime => 0,
            Column::ScreenOff => 1,
        }
    }
}

/// Process-wide power context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeBase {
    pub on_battery: bool,
    pub screen_off: bool,
    /// Elapsed-realtime timestamp of the last transition
    pub last_transition_ms: u64,
}

impl TimeBase {
    /// Apply a transition. Returns `false` if the timestamp went backwards
    /// (the transition is applied regardless).
    pub fn transition(&mut self, on_battery: bool, screen_off: bool, timestamp_ms: u64) -> bool {
        let monotonic = timestamp_ms >= self.last_transition_ms;
        self.on_battery = on_battery;
        self.screen_off = screen_off;
        self.last_transition_ms = timestamp_ms;
        monotonic
    }

    /// Whether deltas committed now also go to the screen-off column
    pub fn screen_off_active(&self) -> bool {
        self.on_battery && self.screen_off
    }
}
