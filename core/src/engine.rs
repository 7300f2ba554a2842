//! The resolution engine: the heart of the matching game.
//!
//! FLOW (per player pick):
//!   1. request_reveal()        tile Hidden -> Revealing
//!   2. transition completes    tile Revealing -> Revealed, enters the queue
//!   3. queue reaches two       the two oldest entries resolve atomically
//!        match    -> both Matched, score.on_match(), maybe GameOver
//!        mismatch -> score.on_mismatch(), close scheduled after the delay
//!
//! RULES:
//!   - Resolution is FIFO by reveal completion, never by click order.
//!   - Only the engine, the score tracker and restore write game state.
//!   - Every state change is announced as a GameEvent.
//!   - A mismatch close never blocks new reveals.

use crate::{
    board::{self, Board},
    clock::GameClock,
    config::GameConfig,
    error::{MatchError, MatchResult},
    event::GameEvent,
    listener::GameListener,
    scheduler::{PinnedTile, Scheduler, Task},
    score::{ScoreState, ScoreTracker},
    snapshot::Snapshot,
    tile::{Tile, TileState, TransitionKind, TransitionToken},
    types::{GameId, Seed, SlotIndex, Time},
};
use std::collections::VecDeque;

/// Revealed tiles waiting for a partner, oldest first.
#[derive(Debug, Default, Clone)]
pub struct RevealQueue {
    entries: VecDeque<SlotIndex>,
}

impl RevealQueue {
    pub fn push(&mut self, slot: SlotIndex) {
        self.entries.push_back(slot);
    }

    /// The two oldest entries, only once both are present.
    pub fn pop_pair(&mut self) -> Option<(SlotIndex, SlotIndex)> {
        if self.entries.len() < 2 {
            return None;
        }
        let a = self.entries.pop_front()?;
        let b = self.entries.pop_front()?;
        Some((a, b))
    }

    pub fn contains(&self, slot: SlotIndex) -> bool {
        self.entries.contains(&slot)
    }

    pub fn retain(&mut self, keep: impl FnMut(&SlotIndex) -> bool) {
        self.entries.retain(keep);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        self.entries.iter().copied()
    }
}

pub struct MatchEngine {
    pub game_id: GameId,
    pub clock:   GameClock,
    config:      GameConfig,
    board:       Board,
    queue:       RevealQueue,
    scheduler:   Scheduler,
    score:       ScoreTracker,
    game_over:   bool,
    outbox:      Vec<GameEvent>,
    listeners:   Vec<Box<dyn GameListener>>,
}

impl MatchEngine {
    /// Fresh shuffled layout. The GameStarted event waits in the outbox
    /// until the first operation (or drain_events()).
    pub fn new_game(
        game_id: GameId,
        config: GameConfig,
        rows: u32,
        cols: u32,
        seed: Seed,
    ) -> MatchResult<Self> {
        let board = board::generate(rows, cols, seed, None)?;
        let mut engine = Self::with_board(game_id, config, board);
        engine.announce_start(false);
        let reset = engine.score.reset();
        engine.outbox.extend(reset);
        Ok(engine)
    }

    /// Build an engine straight from a saved snapshot.
    pub fn from_snapshot(
        game_id: GameId,
        config: GameConfig,
        snapshot: &Snapshot,
    ) -> MatchResult<Self> {
        let clock = GameClock::new();
        let (board, score, score_events) = rebuild(&config, snapshot, clock.now)?;
        let mut engine = Self::with_board(game_id, config, board);
        engine.score = score;
        engine.game_over = engine.board.all_matched();
        engine.announce_start(true);
        engine.outbox.extend(score_events);
        engine.settle_strays();
        Ok(engine)
    }

    /// Engine on the instant-transition test config.
    pub fn build_test(game_id: GameId, rows: u32, cols: u32, seed: Seed) -> MatchResult<Self> {
        Self::new_game(game_id, GameConfig::default_test(), rows, cols, seed)
    }

    fn with_board(game_id: GameId, config: GameConfig, board: Board) -> Self {
        let score = ScoreTracker::new(config.scoring.clone());
        Self {
            game_id,
            clock: GameClock::new(),
            config,
            board,
            queue: RevealQueue::default(),
            scheduler: Scheduler::new(),
            score,
            game_over: false,
            outbox: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn register_listener(&mut self, listener: Box<dyn GameListener>) {
        log::debug!("engine: listener '{}' registered", listener.name());
        self.listeners.push(listener);
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn board(&self) -> &Board { &self.board }
    pub fn config(&self) -> &GameConfig { &self.config }
    pub fn score(&self) -> &ScoreState { &self.score.state }
    pub fn now(&self) -> Time { self.clock.now }
    pub fn is_game_over(&self) -> bool { self.game_over }

    pub fn tile(&self, slot: SlotIndex) -> Option<&Tile> {
        self.board.tile(slot)
    }

    /// Revealed tiles waiting for a partner, oldest first.
    pub fn queued(&self) -> Vec<SlotIndex> {
        self.queue.iter().collect()
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    /// The instant the next timed task fires, if any.
    pub fn next_due(&self) -> Option<Time> {
        self.scheduler.next_due()
    }

    /// Whether a pick on `slot` would start a reveal right now.
    pub fn accepts_input(&self, slot: SlotIndex) -> bool {
        !self.game_over
            && self.board.tile(slot).is_some_and(|t| t.state() == TileState::Hidden)
    }

    /// No flip in flight and no mismatch close pending.
    pub fn is_settled(&self) -> bool {
        !self.scheduler.has_pending_close()
            && self.board.tiles().all(|t| t.state() != TileState::Revealing)
    }

    // ── Operations ─────────────────────────────────────────────

    /// Player pick. Busy or non-hidden tiles, and any pick after game
    /// over, are absorbed without error.
    pub fn request_reveal(&mut self, slot: SlotIndex) -> MatchResult<Vec<GameEvent>> {
        let game_over = self.game_over;
        let tile = self
            .board
            .tile_mut(slot)
            .ok_or(MatchError::InvalidSlot { slot })?;

        let token = if game_over {
            log::trace!("engine: pick {slot} after game over ignored");
            None
        } else if tile.is_busy() {
            log::trace!("engine: pick {slot} ignored, tile busy ({:?})", tile.state());
            None
        } else {
            tile.request_reveal()
        };

        if let Some(token) = token {
            self.start_transition(token);
        }
        Ok(self.flush())
    }

    /// Presentation reports the end of a visual transition. Stale or
    /// repeated completions are ignored.
    pub fn complete_transition(&mut self, token: TransitionToken) -> MatchResult<Vec<GameEvent>> {
        self.apply_completion(token)?;
        Ok(self.flush())
    }

    /// Single entry point into resolution: a tile finished revealing.
    /// Tiles that are not Revealed (interrupted, matched) are ignored.
    pub fn on_tile_revealed(&mut self, slot: SlotIndex) -> Vec<GameEvent> {
        self.enqueue_revealed(slot);
        self.flush()
    }

    /// Move logical time forward by `dt`, firing due tasks in order.
    /// Each task runs at its own due instant.
    pub fn advance(&mut self, dt: Time) -> MatchResult<Vec<GameEvent>> {
        let target = self.clock.target(dt);
        while let Some((due, task)) = self.scheduler.pop_due(target) {
            self.clock.advance_to(due);
            self.run_task(task)?;
        }
        self.clock.advance_to(target);
        Ok(self.flush())
    }

    /// Replace the layout with a fresh shuffle. Validated before any
    /// live state is touched.
    pub fn start_new_layout(&mut self, rows: u32, cols: u32, seed: Seed) -> MatchResult<Vec<GameEvent>> {
        let board = board::generate(rows, cols, seed, None)?;
        Ok(self.install_layout(board))
    }

    /// Like start_new_layout, but the game also takes a new id. The id is
    /// only swapped once the layout has been accepted.
    pub fn start_new_game(
        &mut self,
        game_id: GameId,
        rows: u32,
        cols: u32,
        seed: Seed,
    ) -> MatchResult<Vec<GameEvent>> {
        let board = board::generate(rows, cols, seed, None)?;
        self.game_id = game_id;
        Ok(self.install_layout(board))
    }

    fn install_layout(&mut self, board: Board) -> Vec<GameEvent> {
        self.board = board;
        self.queue.clear();
        self.scheduler.clear();
        self.game_over = false;
        self.announce_start(false);
        let reset = self.score.reset();
        self.outbox.extend(reset);
        self.flush()
    }

    pub fn capture(&self) -> Snapshot {
        Snapshot::capture(&self.board, &self.score.state)
    }

    /// Restore in place. The whole snapshot is validated and the new
    /// board built before any live state is replaced.
    pub fn restore(&mut self, snapshot: &Snapshot) -> MatchResult<Vec<GameEvent>> {
        let (board, score, score_events) = rebuild(&self.config, snapshot, self.clock.now)?;

        self.board = board;
        self.score = score;
        self.queue.clear();
        self.scheduler.clear();
        self.game_over = self.board.all_matched();

        self.announce_start(true);
        self.outbox.extend(score_events);
        self.settle_strays();
        Ok(self.flush())
    }

    /// Hand out anything queued by construction.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.flush()
    }

    // ── Internals ──────────────────────────────────────────────

    fn announce_start(&mut self, restored: bool) {
        log::info!(
            "engine: game {} {} {}x{} seed={}",
            self.game_id,
            if restored { "restored" } else { "started" },
            self.board.rows(),
            self.board.cols(),
            self.board.seed()
        );
        self.outbox.push(GameEvent::GameStarted {
            game_id:  self.game_id.clone(),
            rows:     self.board.rows(),
            cols:     self.board.cols(),
            seed:     self.board.seed(),
            restored,
        });
    }

    fn start_transition(&mut self, token: TransitionToken) {
        self.outbox.push(GameEvent::TransitionStarted { token });
        if self.config.self_timed {
            let duration = match token.kind {
                TransitionKind::Reveal | TransitionKind::Hide => self.config.flip_duration,
                TransitionKind::MatchedFade => self.config.fade_duration,
            };
            self.scheduler
                .schedule(self.clock.now + duration, Task::CompleteTransition(token));
        }
    }

    fn apply_completion(&mut self, token: TransitionToken) -> MatchResult<()> {
        let slot = token.slot;
        let tile = self
            .board
            .tile_mut(slot)
            .ok_or(MatchError::InvalidSlot { slot })?;

        match tile.complete(token) {
            Some(TransitionKind::Reveal) => {
                self.outbox.push(GameEvent::TileRevealed { slot });
                self.enqueue_revealed(slot);
            }
            Some(TransitionKind::Hide) => self.outbox.push(GameEvent::TileHidden { slot }),
            Some(TransitionKind::MatchedFade) => self.outbox.push(GameEvent::TileFaded { slot }),
            None => {}
        }
        Ok(())
    }

    fn enqueue_revealed(&mut self, slot: SlotIndex) {
        match self.board.tile(slot) {
            Some(tile) if tile.is_revealed() => {}
            other => {
                log::warn!(
                    "engine: tile {slot} reported revealed but is {:?}, ignoring",
                    other.map(Tile::state)
                );
                return;
            }
        }
        if self.queue.contains(slot) {
            log::warn!("engine: tile {slot} already queued, ignoring");
            return;
        }
        self.queue.push(slot);
        self.resolve_queue();
    }

    fn resolve_queue(&mut self) {
        let board = &self.board;
        self.queue
            .retain(|&slot| board.tile(slot).is_some_and(Tile::is_revealed));

        while let Some((a, b)) = self.queue.pop_pair() {
            if a == b {
                log::warn!("engine: tile {a} dequeued against itself, discarding");
                continue;
            }
            let (Some(pair_a), Some(pair_b)) = (
                self.board.tile(a).map(Tile::pair_id),
                self.board.tile(b).map(Tile::pair_id),
            ) else {
                continue;
            };
            if pair_a == pair_b {
                self.resolve_match(a, b);
            } else {
                self.resolve_mismatch(a, b);
            }
        }
    }

    fn resolve_match(&mut self, a: SlotIndex, b: SlotIndex) {
        let now = self.clock.now;
        let mut pair_id = 0;
        for slot in [a, b] {
            if let Some(tile) = self.board.tile_mut(slot) {
                pair_id = tile.pair_id();
                if let Some(token) = tile.set_matched() {
                    self.start_transition(token);
                }
            }
        }
        log::debug!("t={now:.2} engine: match {a} & {b} (pair {pair_id})");
        self.outbox.push(GameEvent::PairMatched { first: a, second: b, pair_id });
        let score_events = self.score.on_match(now);
        self.outbox.extend(score_events);

        if !self.game_over && self.board.all_matched() {
            self.game_over = true;
            log::info!(
                "engine: game {} over, final score {}",
                self.game_id, self.score.state.score
            );
            self.outbox.push(GameEvent::GameOver { score: self.score.state.score });
        }
    }

    fn resolve_mismatch(&mut self, a: SlotIndex, b: SlotIndex) {
        let now = self.clock.now;
        log::debug!("t={now:.2} engine: mismatch {a} & {b}");
        self.outbox.push(GameEvent::PairMismatched { first: a, second: b });
        let score_events = self.score.on_mismatch();
        self.outbox.extend(score_events);

        let pins = self.pin([a, b]);
        self.scheduler
            .schedule(now + self.config.mismatch_close_delay, Task::CloseRevealed(pins));
    }

    /// Tiles left Revealed by a restore have lost their queue context.
    /// Close them after the usual delay, with no score effect.
    fn settle_strays(&mut self) {
        let strays: Vec<SlotIndex> = self
            .board
            .tiles()
            .filter(|t| t.is_revealed())
            .map(Tile::slot)
            .collect();
        if strays.is_empty() {
            return;
        }
        log::debug!("engine: closing {} stray revealed tiles after restore", strays.len());
        let pins = self.pin(strays);
        self.scheduler.schedule(
            self.clock.now + self.config.mismatch_close_delay,
            Task::CloseRevealed(pins),
        );
    }

    fn pin(&self, slots: impl IntoIterator<Item = SlotIndex>) -> Vec<PinnedTile> {
        slots
            .into_iter()
            .filter_map(|slot| {
                self.board
                    .tile(slot)
                    .map(|t| PinnedTile { slot, generation: t.generation() })
            })
            .collect()
    }

    fn run_task(&mut self, task: Task) -> MatchResult<()> {
        match task {
            Task::CompleteTransition(token) => self.apply_completion(token)?,
            Task::CloseRevealed(pins) => {
                for pin in pins {
                    let token = self
                        .board
                        .tile_mut(pin.slot)
                        .filter(|t| t.generation() == pin.generation && t.is_revealed())
                        .and_then(Tile::request_hide);
                    match token {
                        Some(token) => self.start_transition(token),
                        None => log::debug!(
                            "engine: close of tile {} skipped, state changed meanwhile",
                            pin.slot
                        ),
                    }
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Vec<GameEvent> {
        let events = std::mem::take(&mut self.outbox);
        for event in &events {
            for listener in &mut self.listeners {
                listener.on_event(event);
            }
        }
        events
    }
}

/// Validate a snapshot and build the replacement board and score without
/// touching any live engine.
fn rebuild(
    config: &GameConfig,
    snapshot: &Snapshot,
    now: Time,
) -> MatchResult<(Board, ScoreTracker, Vec<GameEvent>)> {
    snapshot.validate()?;
    let board = board::generate(snapshot.rows, snapshot.cols, snapshot.seed, Some(&snapshot.tiles))?;
    let mut score = ScoreTracker::new(config.scoring.clone());
    let events = score.restore(snapshot.score, config.score_restore, now);
    Ok((board, score, events))
}
