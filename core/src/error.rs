use crate::{tile::TileState, types::SlotIndex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Invalid layout: {rows}x{cols} (rows and cols must be positive)")]
    InvalidLayout { rows: u32, cols: u32 },

    #[error("Invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    #[error("Illegal transition: cannot {op} tile {slot} while {state:?}")]
    IllegalTransition {
        slot:  SlotIndex,
        state: TileState,
        op:    &'static str,
    },

    #[error("Slot {slot} does not hold a playable tile")]
    InvalidSlot { slot: SlotIndex },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MatchError {
    pub(crate) fn snapshot(reason: impl Into<String>) -> Self {
        Self::InvalidSnapshot { reason: reason.into() }
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
