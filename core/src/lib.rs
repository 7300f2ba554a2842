//! Matching-game engine: deterministic paired-tile layouts, per-tile
//! reveal state, pair resolution, combo scoring and save/restore.

pub mod autoplay;
pub mod board;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod listener;
pub mod rng;
pub mod scheduler;
pub mod score;
pub mod snapshot;
pub mod store;
pub mod tile;
pub mod types;
