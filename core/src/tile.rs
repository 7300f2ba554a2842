//! One card on the board: identity plus its reveal-state machine.
//!
//!   Hidden -> Revealing -> Revealed -> Revealing -> Hidden   (flip-close)
//!   Hidden -> Revealing -> Revealed -> Matched               (terminal)
//!
//! Every visual transition is tracked by a TransitionToken. Starting a new
//! transition bumps the tile's generation, which invalidates any token
//! handed out earlier. Completions carrying a stale token are ignored.

use crate::{
    error::{MatchError, MatchResult},
    types::{PairId, SlotIndex},
};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileState {
    Hidden,
    Revealing,
    Revealed,
    Matched,
}

impl TileState {
    /// Nearest state a tile can be restored into.
    /// Both directions of an in-flight flip settle face down.
    pub const fn settled(self) -> Self {
        match self {
            Self::Revealing => Self::Hidden,
            other => other,
        }
    }
}

impl Default for TileState {
    fn default() -> Self {
        Self::Hidden
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Reveal,
    Hide,
    MatchedFade,
}

/// Handle for one in-flight visual transition of one tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionToken {
    pub slot:       SlotIndex,
    pub generation: u32,
    pub kind:       TransitionKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    pair_id:    PairId,
    slot:       SlotIndex,
    state:      TileState,
    active:     bool,
    generation: u32,
    in_flight:  Option<TransitionKind>,
}

impl Tile {
    pub fn new(slot: SlotIndex, pair_id: PairId) -> Self {
        Self {
            pair_id,
            slot,
            state:      TileState::Hidden,
            active:     true,
            generation: 0,
            in_flight:  None,
        }
    }

    /// Rebuild a tile from saved state. Transient states are settled.
    pub fn restored(slot: SlotIndex, pair_id: PairId, state: TileState, active: bool) -> Self {
        Self {
            state: state.settled(),
            active,
            ..Self::new(slot, pair_id)
        }
    }

    pub fn pair_id(&self) -> PairId { self.pair_id }
    pub fn slot(&self) -> SlotIndex { self.slot }
    pub fn state(&self) -> TileState { self.state }
    pub fn generation(&self) -> u32 { self.generation }
    pub fn in_flight(&self) -> Option<TransitionKind> { self.in_flight }

    /// Whether the tile is still a live, visible entity.
    /// Cleared once the matched-fade completes.
    pub fn is_active(&self) -> bool { self.active }

    pub fn is_matched(&self) -> bool {
        self.state == TileState::Matched
    }

    pub fn is_revealed(&self) -> bool {
        self.state == TileState::Revealed
    }

    /// Busy tiles must not receive player-initiated input.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, TileState::Revealing | TileState::Matched)
    }

    /// Strict reveal: fails unless the tile is Hidden.
    pub fn try_reveal(&mut self) -> MatchResult<TransitionToken> {
        self.check(TileState::Hidden, "reveal")?;
        self.state = TileState::Revealing;
        Ok(self.begin(TransitionKind::Reveal))
    }

    /// Strict hide: fails unless the tile is Revealed.
    pub fn try_hide(&mut self) -> MatchResult<TransitionToken> {
        self.check(TileState::Revealed, "hide")?;
        self.state = TileState::Revealing;
        Ok(self.begin(TransitionKind::Hide))
    }

    /// Lenient reveal. A call from any state but Hidden is a no-op.
    pub fn request_reveal(&mut self) -> Option<TransitionToken> {
        self.try_reveal().map_err(|e| log::trace!("{e}")).ok()
    }

    /// Lenient hide. A call from any state but Revealed is a no-op.
    pub fn request_hide(&mut self) -> Option<TransitionToken> {
        self.try_hide().map_err(|e| log::trace!("{e}")).ok()
    }

    /// Jump straight to Matched, abandoning any in-flight flip, and start
    /// the matched-fade. No-op when already matched.
    pub fn set_matched(&mut self) -> Option<TransitionToken> {
        if self.is_matched() {
            return None;
        }
        self.state = TileState::Matched;
        Some(self.begin(TransitionKind::MatchedFade))
    }

    /// Apply the end of a transition. Returns the completed kind, or
    /// `None` when the token is stale or belongs to another tile.
    pub fn complete(&mut self, token: TransitionToken) -> Option<TransitionKind> {
        if token.slot != self.slot
            || token.generation != self.generation
            || self.in_flight != Some(token.kind)
        {
            log::trace!(
                "tile {}: ignoring stale {:?} completion (gen {} vs {})",
                self.slot, token.kind, token.generation, self.generation
            );
            return None;
        }
        self.in_flight = None;
        match token.kind {
            TransitionKind::Reveal      => self.state = TileState::Revealed,
            TransitionKind::Hide        => self.state = TileState::Hidden,
            TransitionKind::MatchedFade => self.active = false,
        }
        Some(token.kind)
    }

    fn check(&self, expected: TileState, op: &'static str) -> MatchResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(MatchError::IllegalTransition { slot: self.slot, state: self.state, op })
        }
    }

    fn begin(&mut self, kind: TransitionKind) -> TransitionToken {
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = Some(kind);
        TransitionToken { slot: self.slot, generation: self.generation, kind }
    }
}
