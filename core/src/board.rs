//! Board generator: deterministic placement of paired tiles into a grid.
//!
//! The pairId assignment is a pure function of (rows, cols, seed).
//! Restoring from saved tiles bypasses the shuffle entirely.

use crate::{
    error::{MatchError, MatchResult},
    rng::{RngStream, StreamRng},
    snapshot::TileRecord,
    tile::{Tile, TileState},
    types::{PairId, Seed, SlotIndex},
};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    Card(Tile),
    /// Non-playable filler for the centre slot of an odd-sized grid.
    Spacer,
}

impl Slot {
    pub fn tile(&self) -> Option<&Tile> {
        match self {
            Self::Card(tile) => Some(tile),
            Self::Spacer     => None,
        }
    }

    pub fn tile_mut(&mut self) -> Option<&mut Tile> {
        match self {
            Self::Card(tile) => Some(tile),
            Self::Spacer     => None,
        }
    }

    pub fn is_spacer(&self) -> bool {
        matches!(self, Self::Spacer)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Board {
    rows:  u32,
    cols:  u32,
    seed:  Seed,
    slots: Vec<Slot>,
}

impl Board {
    pub fn rows(&self) -> u32 { self.rows }
    pub fn cols(&self) -> u32 { self.cols }
    pub fn seed(&self) -> Seed { self.seed }
    pub fn slots(&self) -> &[Slot] { &self.slots }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn spacer(&self) -> Option<SlotIndex> {
        spacer_index(self.rows, self.cols)
    }

    pub fn pair_count(&self) -> usize {
        self.tiles().count() / 2
    }

    /// `(row, col)` of a slot.
    pub fn position(&self, slot: SlotIndex) -> (u32, u32) {
        let cols = self.cols as usize;
        ((slot / cols) as u32, (slot % cols) as u32)
    }

    pub fn tile(&self, slot: SlotIndex) -> Option<&Tile> {
        self.slots.get(slot).and_then(Slot::tile)
    }

    pub fn tile_mut(&mut self, slot: SlotIndex) -> Option<&mut Tile> {
        self.slots.get_mut(slot).and_then(Slot::tile_mut)
    }

    /// Playable tiles in slot order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.slots.iter().filter_map(Slot::tile)
    }

    pub fn matched_count(&self) -> usize {
        self.tiles().filter(|t| t.is_matched()).count()
    }

    /// True once every playable tile is Matched. Vacuously false for a
    /// board without playable tiles (a 1x1 grid is a lone spacer).
    pub fn all_matched(&self) -> bool {
        let mut tiles = self.tiles().peekable();
        tiles.peek().is_some() && tiles.all(Tile::is_matched)
    }
}

/// The spacer slot for an odd-sized grid: the slot nearest the centre.
pub fn spacer_index(rows: u32, cols: u32) -> Option<SlotIndex> {
    let total = rows as usize * cols as usize;
    if total % 2 == 0 {
        return None;
    }
    let centre_row = (rows / 2) as usize;
    let centre_col = (cols / 2) as usize;
    Some(centre_row * cols as usize + centre_col)
}

/// Shuffled pairIds for the playable slots, in slot order (spacer skipped).
pub fn layout_pair_ids(rows: u32, cols: u32, seed: Seed) -> Vec<PairId> {
    let total = rows as usize * cols as usize;
    let playable = total - spacer_index(rows, cols).map_or(0, |_| 1);
    let pair_count = (playable / 2) as PairId;

    let mut pair_ids: Vec<PairId> = (0..pair_count).flat_map(|id| [id, id]).collect();
    StreamRng::new(seed, RngStream::Layout).shuffle(&mut pair_ids);
    pair_ids
}

/// The stateless face lookup handed to presentation collaborators.
pub fn face_index(pair_id: PairId, face_count: usize) -> Option<usize> {
    (face_count > 0).then(|| pair_id as usize % face_count)
}

/// Build a board. With `saved` tiles the shuffle is skipped and every slot
/// takes its pairId and state from the saved record at the same index.
pub fn generate(
    rows: u32,
    cols: u32,
    seed: Seed,
    saved: Option<&[TileRecord]>,
) -> MatchResult<Board> {
    if rows == 0 || cols == 0 {
        return Err(MatchError::InvalidLayout { rows, cols });
    }
    let total = (rows as usize)
        .checked_mul(cols as usize)
        .ok_or(MatchError::InvalidLayout { rows, cols })?;
    let spacer = spacer_index(rows, cols);

    let slots = match saved {
        None => {
            let mut pair_ids = layout_pair_ids(rows, cols, seed).into_iter();
            (0..total)
                .map(|slot| {
                    if Some(slot) == spacer {
                        return Ok(Slot::Spacer);
                    }
                    let pair_id = pair_ids
                        .next()
                        .ok_or(MatchError::InvalidLayout { rows, cols })?;
                    Ok(Slot::Card(Tile::new(slot, pair_id)))
                })
                .collect::<MatchResult<Vec<_>>>()?
        }
        Some(records) => saved_slots(total, spacer, records)?,
    };

    log::debug!(
        "board: {rows}x{cols} seed={seed} pairs={} spacer={spacer:?} restored={}",
        slots.iter().filter(|s| !s.is_spacer()).count() / 2,
        saved.is_some()
    );

    Ok(Board { rows, cols, seed, slots })
}

fn saved_slots(
    total: usize,
    spacer: Option<SlotIndex>,
    records: &[TileRecord],
) -> MatchResult<Vec<Slot>> {
    if records.len() != total {
        return Err(MatchError::snapshot(format!(
            "tile count {} does not match grid size {total}",
            records.len()
        )));
    }

    let mut pairs: BTreeMap<PairId, Vec<TileState>> = BTreeMap::new();
    let mut slots = Vec::with_capacity(total);
    for (slot, record) in records.iter().enumerate() {
        // The spacer slot carries no card; whatever was saved there is ignored.
        if Some(slot) == spacer {
            slots.push(Slot::Spacer);
            continue;
        }
        if record.spacer {
            return Err(MatchError::snapshot(format!(
                "slot {slot} is flagged as spacer but holds a card"
            )));
        }
        pairs.entry(record.pair_id).or_default().push(record.state);
        slots.push(Slot::Card(Tile::restored(
            slot,
            record.pair_id,
            record.state,
            record.active,
        )));
    }

    for (pair_id, states) in &pairs {
        if states.len() != 2 {
            return Err(MatchError::snapshot(format!(
                "pairId {pair_id} appears {} times, expected exactly 2",
                states.len()
            )));
        }
        let matched = states.iter().filter(|&&s| s == TileState::Matched).count();
        if matched == 1 {
            return Err(MatchError::snapshot(format!(
                "pairId {pair_id} is only half matched"
            )));
        }
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacer_only_for_odd_grids() {
        assert_eq!(spacer_index(4, 4), None);
        assert_eq!(spacer_index(5, 6), None);
        assert_eq!(spacer_index(3, 3), Some(4));
        assert_eq!(spacer_index(5, 5), Some(12));
        assert_eq!(spacer_index(1, 1), Some(0));
        assert_eq!(spacer_index(3, 5), Some(7));
    }

    #[test]
    fn face_index_wraps_by_face_count() {
        assert_eq!(face_index(7, 5), Some(2));
        assert_eq!(face_index(3, 0), None);
    }

    #[test]
    fn position_is_row_major() {
        let board = generate(3, 4, 1, None).unwrap();
        assert_eq!(board.position(0), (0, 0));
        assert_eq!(board.position(5), (1, 1));
        assert_eq!(board.position(11), (2, 3));
    }

    #[test]
    fn lone_spacer_board_is_never_complete() {
        let board = generate(1, 1, 0, None).unwrap();
        assert_eq!(board.tiles().count(), 0);
        assert!(!board.all_matched());
    }
}
