//! Game clock: owns logical time and pause.

use crate::types::Time;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GameClock {
    pub now:    Time,
    pub paused: bool,
}

impl GameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `t`. Time never runs backwards; an earlier `t` is ignored.
    pub fn advance_to(&mut self, t: Time) -> Time {
        if t > self.now {
            self.now = t;
        }
        self.now
    }

    /// The instant `dt` from now. Paused clocks and negative steps stay put.
    pub fn target(&self, dt: Time) -> Time {
        if self.paused || !(dt > 0.0) {
            self.now
        } else {
            self.now + dt
        }
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }
}
