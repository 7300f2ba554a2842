//! The event bus: everything the core tells its collaborators.
//!
//! RULE: Collaborators (audio, score UI, presentation, persistence) learn
//! about state changes ONLY through events. They never write core state.

use crate::{
    tile::TransitionToken,
    types::{GameId, PairId, Seed, SlotIndex, Time},
};
use serde::{Deserialize, Serialize};

/// Every event emitted during a game.
/// Variants are append-only. Never remove or reorder them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    // ── Lifecycle ──────────────────────────────────
    GameStarted {
        game_id:  GameId,
        rows:     u32,
        cols:     u32,
        seed:     Seed,
        restored: bool,
    },
    GameOver {
        score: u32,
    },

    // ── Tile transitions ───────────────────────────
    /// A visual transition began. A `reveal` start is also the flip cue.
    TransitionStarted {
        token: TransitionToken,
    },
    TileRevealed {
        slot: SlotIndex,
    },
    TileHidden {
        slot: SlotIndex,
    },
    TileFaded {
        slot: SlotIndex,
    },

    // ── Resolution ─────────────────────────────────
    PairMatched {
        first:   SlotIndex,
        second:  SlotIndex,
        pair_id: PairId,
    },
    PairMismatched {
        first:  SlotIndex,
        second: SlotIndex,
    },

    // ── Score ──────────────────────────────────────
    ScoreChanged {
        score: u32,
    },
    ComboChanged {
        combo: u32,
    },
}

impl GameEvent {
    /// Stable name of the variant, used for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::GameStarted { .. }       => "game_started",
            Self::GameOver { .. }          => "game_over",
            Self::TransitionStarted { .. } => "transition_started",
            Self::TileRevealed { .. }      => "tile_revealed",
            Self::TileHidden { .. }        => "tile_hidden",
            Self::TileFaded { .. }         => "tile_faded",
            Self::PairMatched { .. }       => "pair_matched",
            Self::PairMismatched { .. }    => "pair_mismatched",
            Self::ScoreChanged { .. }      => "score_changed",
            Self::ComboChanged { .. }      => "combo_changed",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub game_id:    GameId,
    pub at:         Time,
    pub event_type: String,
    pub payload:    String, // JSON-serialized GameEvent
}

impl EventLogEntry {
    pub fn new(game_id: &str, at: Time, event: &GameEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id:         None,
            game_id:    game_id.to_string(),
            at,
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        })
    }
}
