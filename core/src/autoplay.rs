//! A deterministic stand-in for the player.
//!
//! Remembers every face it has seen, recalls it with a fixed probability,
//! and otherwise prefers tiles it has never looked at. All choices come
//! from the AutoPlay RNG stream, so (seed, recall) replays identically.

use crate::{
    engine::MatchEngine,
    event::GameEvent,
    rng::{RngStream, StreamRng},
    tile::{Tile, TileState},
    types::{PairId, Seed, SlotIndex},
};
use std::collections::BTreeMap;

pub struct AutoPlayer {
    rng:    StreamRng,
    recall: f64,
    memory: BTreeMap<SlotIndex, PairId>,
}

impl AutoPlayer {
    pub fn new(seed: Seed, recall: f64) -> Self {
        Self {
            rng:    StreamRng::new(seed, RngStream::AutoPlay),
            recall: recall.clamp(0.0, 1.0),
            memory: BTreeMap::new(),
        }
    }

    pub fn remembered(&self) -> usize {
        self.memory.len()
    }

    pub fn observe(&mut self, engine: &MatchEngine, events: &[GameEvent]) {
        for event in events {
            match event {
                GameEvent::TileRevealed { slot } => {
                    if let Some(tile) = engine.tile(*slot) {
                        self.memory.insert(*slot, tile.pair_id());
                    }
                }
                GameEvent::PairMatched { first, second, .. } => {
                    self.memory.remove(first);
                    self.memory.remove(second);
                }
                GameEvent::GameStarted { .. } => self.memory.clear(),
                _ => {}
            }
        }
    }

    /// The next tile to flip, or `None` while the board is still moving.
    pub fn next_pick(&mut self, engine: &MatchEngine) -> Option<SlotIndex> {
        if engine.is_game_over() || !engine.is_settled() {
            return None;
        }
        let hidden: Vec<SlotIndex> = engine
            .board()
            .tiles()
            .filter(|t| t.state() == TileState::Hidden)
            .map(Tile::slot)
            .collect();
        if hidden.is_empty() {
            return None;
        }

        let recalled = match engine.queued().first() {
            Some(&open) => {
                let pair_id = engine.tile(open)?.pair_id();
                self.recall_partner(pair_id, &hidden)
            }
            None => self.recall_known_pair(&hidden),
        };
        recalled.or_else(|| self.pick_unseen(&hidden))
    }

    fn recall_partner(&mut self, pair_id: PairId, hidden: &[SlotIndex]) -> Option<SlotIndex> {
        let partner = self
            .memory
            .iter()
            .find(|&(slot, &p)| p == pair_id && hidden.contains(slot))
            .map(|(&slot, _)| slot)?;
        self.rng.chance(self.recall).then_some(partner)
    }

    fn recall_known_pair(&mut self, hidden: &[SlotIndex]) -> Option<SlotIndex> {
        let mut by_pair: BTreeMap<PairId, Vec<SlotIndex>> = BTreeMap::new();
        for (&slot, &pair_id) in &self.memory {
            if hidden.contains(&slot) {
                by_pair.entry(pair_id).or_default().push(slot);
            }
        }
        let slot = by_pair.values().find(|slots| slots.len() >= 2)?[0];
        self.rng.chance(self.recall).then_some(slot)
    }

    fn pick_unseen(&mut self, hidden: &[SlotIndex]) -> Option<SlotIndex> {
        let unseen: Vec<SlotIndex> = hidden
            .iter()
            .copied()
            .filter(|slot| !self.memory.contains_key(slot))
            .collect();
        let pool = if unseen.is_empty() { hidden } else { &unseen[..] };
        self.rng.pick(pool).copied()
    }
}
