//! Shared primitive types used across the entire engine.

/// Linear slot index on the board: `row * cols + col`.
pub type SlotIndex = usize;

/// Key shared by exactly two playable tiles.
pub type PairId = u32;

/// Layout seed. Fully determines the shuffle for a given grid size.
pub type Seed = u64;

/// Logical time in seconds. Monotonic within a session.
pub type Time = f64;

/// The canonical game identifier.
pub type GameId = String;
