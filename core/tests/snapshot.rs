use cardmatch_core::{
    config::{GameConfig, ScoreRestore},
    engine::MatchEngine,
    error::MatchError,
    event::GameEvent,
    snapshot::{Snapshot, TileRecord, SNAPSHOT_VERSION},
    tile::{TileState, TransitionKind},
    types::SlotIndex,
};
use serde_json::json;
use std::collections::BTreeMap;

fn test_engine(rows: u32, cols: u32, seed: u64) -> MatchEngine {
    let mut engine = MatchEngine::build_test("snapshot-test".into(), rows, cols, seed).unwrap();
    engine.drain_events();
    engine
}

fn flip(engine: &mut MatchEngine, slot: SlotIndex) {
    engine.request_reveal(slot).unwrap();
    engine.advance(0.0).unwrap();
}

fn pairs(engine: &MatchEngine) -> Vec<(SlotIndex, SlotIndex)> {
    let mut by_pair: BTreeMap<u32, Vec<SlotIndex>> = BTreeMap::new();
    for tile in engine.board().tiles() {
        by_pair.entry(tile.pair_id()).or_default().push(tile.slot());
    }
    by_pair.values().map(|s| (s[0], s[1])).collect()
}

/// One pair matched, one tile left face up.
fn mid_game(rows: u32, cols: u32, seed: u64) -> MatchEngine {
    let mut engine = test_engine(rows, cols, seed);
    let p = pairs(&engine);
    flip(&mut engine, p[0].0);
    flip(&mut engine, p[0].1);
    flip(&mut engine, p[1].0);
    engine
}

fn is_invalid_snapshot<T: std::fmt::Debug>(result: Result<T, MatchError>) -> bool {
    matches!(result, Err(MatchError::InvalidSnapshot { .. }))
}

fn hidden(pair_id: u32) -> serde_json::Value {
    json!({ "pairId": pair_id, "state": "Hidden", "active": true })
}

#[test]
fn capture_restore_round_trip() {
    let engine = mid_game(4, 4, 453);
    let snapshot = engine.capture();
    let json = snapshot.to_json().unwrap();

    let decoded = Snapshot::from_json(&json).unwrap();
    assert_eq!(decoded, snapshot);

    let restored =
        MatchEngine::from_snapshot("restored".into(), GameConfig::default_test(), &decoded).unwrap();
    let before: Vec<(u32, TileState)> =
        engine.board().tiles().map(|t| (t.pair_id(), t.state())).collect();
    let after: Vec<(u32, TileState)> =
        restored.board().tiles().map(|t| (t.pair_id(), t.state())).collect();
    assert_eq!(before, after);
    assert_eq!(restored.score().score, engine.score().score);
    assert_eq!(restored.capture(), snapshot);
}

#[test]
fn odd_grid_round_trip_keeps_spacer() {
    let engine = mid_game(5, 5, 99);
    let snapshot = engine.capture();
    assert_eq!(snapshot.tiles.len(), 25);
    assert!(snapshot.tiles[12].spacer);
    assert_eq!(snapshot.tiles.iter().filter(|t| t.spacer).count(), 1);

    let restored =
        MatchEngine::from_snapshot("odd".into(), GameConfig::default_test(), &snapshot).unwrap();
    assert!(restored.board().slots()[12].is_spacer());
    assert_eq!(restored.board().pair_count(), 12);
}

#[test]
fn snapshot_json_uses_logical_schema() {
    let engine = test_engine(3, 3, 2);
    let value: serde_json::Value = serde_json::from_str(&engine.capture().to_json().unwrap()).unwrap();

    assert_eq!(value["rows"], 3);
    assert_eq!(value["cols"], 3);
    assert_eq!(value["seed"], 2);
    assert_eq!(value["score"], 0);
    assert_eq!(value["version"], SNAPSHOT_VERSION);
    let tiles = value["tiles"].as_array().unwrap();
    assert_eq!(tiles.len(), 9);
    assert_eq!(tiles[0]["state"], "Hidden");
    assert!(tiles[0].get("pairId").is_some());
    assert!(tiles[0].get("spacer").is_none(), "spacer flag only on the spacer slot");
    assert_eq!(tiles[4]["spacer"], true);
}

#[test]
fn capture_records_in_flight_flip_as_hidden() {
    let config = GameConfig { self_timed: false, ..GameConfig::default_test() };
    let mut engine = MatchEngine::new_game("mid-flip".into(), config, 2, 2, 0).unwrap();
    engine.request_reveal(0).unwrap();
    assert_eq!(engine.tile(0).unwrap().state(), TileState::Revealing);

    let snapshot = engine.capture();
    assert_eq!(snapshot.tiles[0].state, TileState::Hidden);
}

#[test]
fn matched_and_faded_tiles_record_inactive() {
    let engine = mid_game(2, 4, 6);
    let snapshot = engine.capture();
    let matched: Vec<&TileRecord> = snapshot
        .tiles
        .iter()
        .filter(|t| t.state == TileState::Matched)
        .collect();
    assert_eq!(matched.len(), 2);
    assert!(matched.iter().all(|t| !t.active));
    assert_eq!(snapshot.score, 100);
}

#[test]
fn tile_count_mismatch_is_rejected() {
    let json = json!({
        "rows": 2, "cols": 2, "seed": 1, "score": 0,
        "tiles": [hidden(0), hidden(0), hidden(1)],
    });
    assert!(is_invalid_snapshot(Snapshot::from_json(&json.to_string())));
}

#[test]
fn unknown_state_label_is_rejected() {
    let json = json!({
        "rows": 1, "cols": 2, "seed": 1, "score": 0,
        "tiles": [hidden(0), { "pairId": 0, "state": "Flipping", "active": true }],
    });
    assert!(is_invalid_snapshot(Snapshot::from_json(&json.to_string())));
}

#[test]
fn negative_or_zero_dimensions_are_rejected() {
    let negative = json!({ "rows": -2, "cols": 2, "seed": 1, "score": 0, "tiles": [] });
    assert!(is_invalid_snapshot(Snapshot::from_json(&negative.to_string())));

    let zero = json!({ "rows": 0, "cols": 2, "seed": 1, "score": 0, "tiles": [] });
    assert!(is_invalid_snapshot(Snapshot::from_json(&zero.to_string())));
}

#[test]
fn garbage_and_future_versions_are_rejected() {
    assert!(is_invalid_snapshot(Snapshot::from_json("not json")));

    let future = json!({
        "version": SNAPSHOT_VERSION + 1,
        "rows": 1, "cols": 2, "seed": 1, "score": 0,
        "tiles": [hidden(0), hidden(0)],
    });
    assert!(is_invalid_snapshot(Snapshot::from_json(&future.to_string())));
}

#[test]
fn missing_version_defaults_to_current() {
    let legacy = json!({
        "rows": 1, "cols": 2, "seed": 1, "score": 0,
        "tiles": [hidden(0), hidden(0)],
    });
    let snapshot = Snapshot::from_json(&legacy.to_string()).unwrap();
    assert_eq!(snapshot.version, SNAPSHOT_VERSION);
}

#[test]
fn spacer_in_wrong_slot_is_rejected() {
    let mut snapshot = test_engine(3, 3, 4).capture();
    snapshot.tiles.swap(0, 4);
    let mut engine = test_engine(2, 2, 0);
    assert!(is_invalid_snapshot(engine.restore(&snapshot)));
}

#[test]
fn unpaired_ids_are_rejected() {
    let mut snapshot = test_engine(2, 2, 4).capture();
    for tile in &mut snapshot.tiles[..3] {
        tile.pair_id = 7;
    }
    let mut engine = test_engine(2, 2, 0);
    assert!(is_invalid_snapshot(engine.restore(&snapshot)));
}

#[test]
fn failed_restore_leaves_live_state_untouched() {
    let mut engine = mid_game(4, 4, 17);
    let board_before = engine.board().clone();
    let score_before = engine.score().clone();
    let queued_before = engine.queued();

    let mut bad = engine.capture();
    bad.tiles.pop();
    assert!(is_invalid_snapshot(engine.restore(&bad)));

    let mut unpaired = engine.capture();
    unpaired.tiles[0].pair_id = 999;
    assert!(is_invalid_snapshot(engine.restore(&unpaired)));

    assert_eq!(*engine.board(), board_before);
    assert_eq!(*engine.score(), score_before);
    assert_eq!(engine.queued(), queued_before);
}

#[test]
fn restore_in_place_replaces_board_and_score() {
    let saved = mid_game(4, 4, 1).capture();
    let mut engine = test_engine(2, 2, 9);

    let events = engine.restore(&saved).unwrap();
    assert!(matches!(events[0], GameEvent::GameStarted { restored: true, rows: 4, cols: 4, .. }));
    assert!(events.contains(&GameEvent::ScoreChanged { score: 100 }));
    assert_eq!(engine.board().len(), 16);
    assert_eq!(engine.board().seed(), 1);
    assert_eq!(engine.score().score, 100);
    assert!(engine.queued().is_empty());
    assert!(!engine.is_game_over());
}

#[test]
fn restored_revealed_tiles_close_without_penalty() {
    let saved = mid_game(4, 4, 3).capture();
    let stray = saved
        .tiles
        .iter()
        .position(|t| t.state == TileState::Revealed)
        .unwrap();

    let mut engine =
        MatchEngine::from_snapshot("strays".into(), GameConfig::default_test(), &saved).unwrap();
    engine.drain_events();
    assert_eq!(engine.tile(stray).unwrap().state(), TileState::Revealed);
    assert!(!engine.is_settled());

    engine.advance(0.5).unwrap();
    assert_eq!(engine.tile(stray).unwrap().state(), TileState::Revealed);
    let events = engine.advance(0.2).unwrap();
    assert_eq!(engine.tile(stray).unwrap().state(), TileState::Hidden);
    assert!(events.contains(&GameEvent::TileHidden { slot: stray }));
    assert!(!events.iter().any(|e| matches!(e, GameEvent::ScoreChanged { .. })));
    assert_eq!(engine.score().score, 100);
}

#[test]
fn restoring_a_finished_game_does_not_refire_game_over() {
    let mut done = test_engine(2, 2, 5);
    for (a, b) in pairs(&done) {
        flip(&mut done, a);
        flip(&mut done, b);
    }
    assert!(done.is_game_over());

    let mut engine =
        MatchEngine::from_snapshot("done".into(), GameConfig::default_test(), &done.capture()).unwrap();
    let events = engine.drain_events();
    assert!(engine.is_game_over());
    assert!(!events.iter().any(|e| matches!(e, GameEvent::GameOver { .. })));
}

#[test]
fn replay_restore_mode_overshoots_like_legacy_loader() {
    let mut saved = test_engine(2, 2, 5).capture();
    saved.score = 250;
    let config = GameConfig { score_restore: ScoreRestore::Replay, ..GameConfig::default_test() };

    let engine = MatchEngine::from_snapshot("replay".into(), config, &saved).unwrap();
    assert_eq!(engine.score().score, 300);
    assert_eq!(engine.score().combo, 2);
}

#[test]
fn restore_cancels_pending_close() {
    let mut engine = test_engine(4, 4, 11);
    let p = pairs(&engine);
    let saved = engine.capture();

    flip(&mut engine, p[0].0);
    flip(&mut engine, p[1].0);
    assert!(engine.pending_tasks() > 0);

    engine.restore(&saved).unwrap();
    assert_eq!(engine.pending_tasks(), 0);
    let events = engine.advance(1.0).unwrap();
    assert!(!events.iter().any(|e| matches!(
        e,
        GameEvent::TransitionStarted { token } if token.kind == TransitionKind::Hide
    )));
}

#[test]
fn odd_grid_snapshot_without_spacer_flag_restores() {
    // Plain {pairId, state, active} records, nine of them for a 3x3 grid.
    let json = json!({
        "rows": 3, "cols": 3, "seed": 42, "score": 100,
        "tiles": [
            hidden(0), hidden(1), hidden(2),
            hidden(0), hidden(9), hidden(1),
            hidden(2), { "pairId": 3, "state": "Matched", "active": false },
            { "pairId": 3, "state": "Matched", "active": false },
        ],
    });
    let snapshot = Snapshot::from_json(&json.to_string()).unwrap();

    let engine =
        MatchEngine::from_snapshot("flagless".into(), GameConfig::default_test(), &snapshot).unwrap();
    assert!(engine.board().slots()[4].is_spacer());
    assert_eq!(engine.board().pair_count(), 4);
    assert_eq!(engine.board().matched_count(), 2);
    assert_eq!(engine.score().score, 100);

    // Re-captured, the centre slot is written as the flagged spacer.
    assert!(engine.capture().tiles[4].spacer);
}

#[test]
fn half_matched_pair_fails_restore_without_mutation() {
    let mut engine = test_engine(1, 4, 3);
    let before = engine.board().clone();

    let json = json!({
        "rows": 1, "cols": 4, "seed": 3, "score": 0,
        "tiles": [
            { "pairId": 0, "state": "Matched", "active": false },
            hidden(0), hidden(1), hidden(1),
        ],
    });
    let snapshot = Snapshot::from_json(&json.to_string()).unwrap();
    assert!(is_invalid_snapshot(engine.restore(&snapshot)));
    assert_eq!(*engine.board(), before);
}
