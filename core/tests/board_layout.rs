use cardmatch_core::{
    board::{generate, spacer_index, Board},
    error::MatchError,
    snapshot::TileRecord,
    tile::TileState,
};
use std::collections::BTreeMap;

fn pair_counts(board: &Board) -> BTreeMap<u32, usize> {
    let mut counts = BTreeMap::new();
    for tile in board.tiles() {
        *counts.entry(tile.pair_id()).or_insert(0) += 1;
    }
    counts
}

#[test]
fn four_by_four_seed_453_has_eight_pairs_and_no_spacer() {
    let board = generate(4, 4, 453, None).unwrap();

    assert_eq!(board.len(), 16);
    assert_eq!(board.tiles().count(), 16);
    assert_eq!(board.spacer(), None);
    assert!(board.slots().iter().all(|s| !s.is_spacer()));

    let counts = pair_counts(&board);
    assert_eq!(counts.len(), 8);
    assert!(counts.values().all(|&c| c == 2), "counts: {counts:?}");
    assert_eq!(counts.keys().copied().collect::<Vec<_>>(), (0..8).collect::<Vec<_>>());
}

#[test]
fn five_by_five_reserves_centre_spacer() {
    let board = generate(5, 5, 9, None).unwrap();

    assert_eq!(board.len(), 25);
    assert_eq!(board.spacer(), Some(12));
    assert!(board.slots()[12].is_spacer());
    assert!(board.tile(12).is_none());
    assert_eq!(board.tiles().count(), 24);
    assert_eq!(board.pair_count(), 12);
    assert!(pair_counts(&board).values().all(|&c| c == 2));
}

#[test]
fn every_pair_appears_exactly_twice_for_many_grids() {
    for rows in 1..=6 {
        for cols in 1..=6 {
            for seed in [0, 7, 453] {
                let board = generate(rows, cols, seed, None).unwrap();
                let total = (rows * cols) as usize;

                assert_eq!(board.len(), total);
                assert_eq!(
                    board.spacer().is_some(),
                    total % 2 == 1,
                    "{rows}x{cols}: spacer presence must follow parity"
                );
                if let Some(spacer) = board.spacer() {
                    assert_eq!(spacer, (rows / 2 * cols + cols / 2) as usize);
                }
                for (pair_id, count) in pair_counts(&board) {
                    assert_eq!(count, 2, "{rows}x{cols} seed {seed}: pair {pair_id} x{count}");
                }
            }
        }
    }
}

#[test]
fn spacer_formula_for_non_square_grids() {
    assert_eq!(spacer_index(3, 5), Some(7));
    assert_eq!(spacer_index(5, 3), Some(7));
    assert_eq!(spacer_index(1, 7), Some(3));
    assert_eq!(spacer_index(2, 3), None);
}

#[test]
fn fresh_tiles_start_hidden_and_active() {
    let board = generate(3, 4, 1, None).unwrap();
    for (slot, tile) in board.slots().iter().enumerate().filter_map(|(i, s)| s.tile().map(|t| (i, t))) {
        assert_eq!(tile.slot(), slot);
        assert_eq!(tile.state(), TileState::Hidden);
        assert!(tile.is_active());
    }
}

#[test]
fn zero_rows_or_cols_is_invalid_layout() {
    for (rows, cols) in [(0, 4), (4, 0), (0, 0)] {
        match generate(rows, cols, 1, None) {
            Err(MatchError::InvalidLayout { rows: r, cols: c }) => {
                assert_eq!((r, c), (rows, cols));
            }
            other => panic!("expected InvalidLayout, got {other:?}"),
        }
    }
}

#[test]
fn saved_tiles_bypass_the_shuffle() {
    let records: Vec<TileRecord> = [1, 0, 0, 1]
        .iter()
        .map(|&pair_id| TileRecord {
            pair_id,
            state:  TileState::Hidden,
            active: true,
            spacer: false,
        })
        .collect();

    // The seed is kept for provenance but must not reorder saved tiles.
    for seed in [0, 1, 999] {
        let board = generate(2, 2, seed, Some(&records)).unwrap();
        let ids: Vec<u32> = board.tiles().map(|t| t.pair_id()).collect();
        assert_eq!(ids, vec![1, 0, 0, 1]);
        assert_eq!(board.seed(), seed);
    }
}

#[test]
fn saved_tiles_keep_their_state() {
    let records = vec![
        TileRecord { pair_id: 0, state: TileState::Matched,   active: false, spacer: false },
        TileRecord { pair_id: 0, state: TileState::Matched,   active: false, spacer: false },
        TileRecord { pair_id: 1, state: TileState::Revealed,  active: true,  spacer: false },
        TileRecord { pair_id: 1, state: TileState::Revealing, active: true,  spacer: false },
    ];
    let board = generate(2, 2, 5, Some(&records)).unwrap();

    let states: Vec<TileState> = board.tiles().map(|t| t.state()).collect();
    assert_eq!(
        states,
        vec![TileState::Matched, TileState::Matched, TileState::Revealed, TileState::Hidden]
    );
    assert!(!board.tile(0).unwrap().is_active());
    assert_eq!(board.matched_count(), 2);
    assert!(!board.all_matched());
}

#[test]
fn saved_tiles_with_unpaired_id_are_rejected() {
    let records: Vec<TileRecord> = [0, 0, 0, 1]
        .iter()
        .map(|&pair_id| TileRecord {
            pair_id,
            state:  TileState::Hidden,
            active: true,
            spacer: false,
        })
        .collect();
    assert!(matches!(
        generate(2, 2, 0, Some(&records)),
        Err(MatchError::InvalidSnapshot { .. })
    ));
}

#[test]
fn spacer_slot_ignores_saved_contents() {
    // A 3x3 save whose centre record is an ordinary, unflagged entry.
    let mut records: Vec<TileRecord> = [0, 0, 1, 1, 9, 2, 2, 3, 3]
        .iter()
        .map(|&pair_id| TileRecord {
            pair_id,
            state:  TileState::Hidden,
            active: true,
            spacer: false,
        })
        .collect();
    records[4].state = TileState::Matched;

    let board = generate(3, 3, 0, Some(&records)).unwrap();
    assert!(board.slots()[4].is_spacer());
    assert_eq!(board.pair_count(), 4);
    assert!(pair_counts(&board).values().all(|&c| c == 2));
}

#[test]
fn spacer_flag_on_card_slot_is_rejected() {
    let mut records: Vec<TileRecord> = [0, 0, 1, 1]
        .iter()
        .map(|&pair_id| TileRecord {
            pair_id,
            state:  TileState::Hidden,
            active: true,
            spacer: false,
        })
        .collect();
    records[2].spacer = true;
    assert!(matches!(
        generate(2, 2, 0, Some(&records)),
        Err(MatchError::InvalidSnapshot { .. })
    ));
}

#[test]
fn half_matched_pair_is_rejected() {
    let records = vec![
        TileRecord { pair_id: 0, state: TileState::Matched, active: false, spacer: false },
        TileRecord { pair_id: 0, state: TileState::Hidden,  active: true,  spacer: false },
        TileRecord { pair_id: 1, state: TileState::Hidden,  active: true,  spacer: false },
        TileRecord { pair_id: 1, state: TileState::Hidden,  active: true,  spacer: false },
    ];
    match generate(1, 4, 0, Some(&records)) {
        Err(MatchError::InvalidSnapshot { reason }) => {
            assert!(reason.contains("half matched"), "reason: {reason}");
        }
        other => panic!("expected InvalidSnapshot, got {other:?}"),
    }
}
