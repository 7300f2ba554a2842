//! Snapshot serialization of board, tile and score state to/from JSON.
//!
//! A snapshot is taken on demand (auto-save, explicit save) and consumed
//! once on restore. Tiles are recorded in slot order so restore can zip
//! them back onto the regenerated board 1:1.

use crate::{
    board::{Board, Slot},
    error::{MatchError, MatchResult},
    score::ScoreState,
    tile::TileState,
    types::{PairId, Seed},
};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileRecord {
    pub pair_id: PairId,
    pub state:   TileState,
    pub active:  bool,
    /// Marks the spacer slot of an odd-sized grid.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub spacer:  bool,
}

impl TileRecord {
    pub fn spacer() -> Self {
        Self {
            pair_id: 0,
            state:   TileState::Hidden,
            active:  false,
            spacer:  true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub rows:    u32,
    pub cols:    u32,
    pub seed:    Seed,
    pub score:   u32,
    pub tiles:   Vec<TileRecord>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl Snapshot {
    /// Walk the board in slot order. In-flight flips are recorded as
    /// Hidden, the state the tile would settle into on restore.
    pub fn capture(board: &Board, score: &ScoreState) -> Self {
        let tiles = board
            .slots()
            .iter()
            .map(|slot| match slot {
                Slot::Spacer => TileRecord::spacer(),
                Slot::Card(tile) => TileRecord {
                    pair_id: tile.pair_id(),
                    state:   tile.state().settled(),
                    active:  tile.is_active(),
                    spacer:  false,
                },
            })
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            rows:    board.rows(),
            cols:    board.cols(),
            seed:    board.seed(),
            score:   score.score,
            tiles,
        }
    }

    /// Shape checks that do not need a board. Per-slot pairing rules are
    /// enforced when the board is rebuilt from the records.
    pub fn validate(&self) -> MatchResult<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(MatchError::snapshot(format!(
                "unsupported version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(MatchError::snapshot(format!(
                "non-positive layout {}x{}",
                self.rows, self.cols
            )));
        }
        let expected = self.rows as usize * self.cols as usize;
        if self.tiles.len() != expected {
            return Err(MatchError::snapshot(format!(
                "tile count {} does not match {}x{} = {expected}",
                self.tiles.len(),
                self.rows,
                self.cols
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> MatchResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode and validate. Any decode failure (unknown state label,
    /// negative number, missing field) is reported as InvalidSnapshot.
    pub fn from_json(json: &str) -> MatchResult<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| MatchError::snapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
