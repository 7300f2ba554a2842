//! Combo-windowed scoring.
//!
//! Pure and synchronous. The tracker never reads the clock itself; the
//! resolution engine passes the instant of each match.

use crate::{
    config::{ScoreRestore, ScoringConfig},
    event::GameEvent,
    types::Time,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    pub score:      u32,
    pub combo:      u32,
    /// `None` is the far-past sentinel: the next match never chains.
    pub last_match: Option<Time>,
}

pub struct ScoreTracker {
    config:    ScoringConfig,
    pub state: ScoreState,
}

impl ScoreTracker {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config, state: ScoreState::default() }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn on_match(&mut self, now: Time) -> Vec<GameEvent> {
        let chained = self
            .state
            .last_match
            .is_some_and(|last| now - last <= self.config.combo_window);
        self.state.combo = if chained { self.state.combo + 1 } else { 1 };
        self.state.last_match = Some(now);

        let added = self.config.match_points.saturating_mul(self.state.combo);
        self.state.score = self.state.score.saturating_add(added);

        log::debug!(
            "score: match +{added} (combo x{}) -> {}",
            self.state.combo, self.state.score
        );

        vec![
            GameEvent::ScoreChanged { score: self.state.score },
            GameEvent::ComboChanged { combo: self.state.combo },
        ]
    }

    pub fn on_mismatch(&mut self) -> Vec<GameEvent> {
        self.state.combo = 0;
        self.state.score = self.state.score.saturating_sub(self.config.mismatch_penalty);
        log::debug!("score: mismatch -{} -> {}", self.config.mismatch_penalty, self.state.score);
        vec![GameEvent::ScoreChanged { score: self.state.score }]
    }

    pub fn reset(&mut self) -> Vec<GameEvent> {
        self.state = ScoreState::default();
        vec![GameEvent::ScoreChanged { score: 0 }]
    }

    /// Rebuild from a saved score, at logical instant `now`.
    pub fn restore(&mut self, saved: u32, mode: ScoreRestore, now: Time) -> Vec<GameEvent> {
        self.reset();
        match mode {
            ScoreRestore::Replay if self.config.match_points > 0 => {
                while self.state.score < saved {
                    self.on_match(now);
                }
            }
            ScoreRestore::Replay => {
                log::warn!("score: replay restore with zero match points, assigning directly");
                self.state.score = saved;
            }
            ScoreRestore::Direct => self.state.score = saved,
        }
        vec![
            GameEvent::ScoreChanged { score: self.state.score },
            GameEvent::ComboChanged { combo: self.state.combo },
        ]
    }
}
