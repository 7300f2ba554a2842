//! match-runner: headless runner for the card-matching engine.
//!
//! Usage:
//!   match-runner --seed 453 --rows 4 --cols 4 --db saves.db
//!   match-runner --preset 5x5 --recall 0.6 --save-every 3
//!   match-runner --db saves.db --resume
//!   match-runner --ipc-mode

use anyhow::Result;
use cardmatch_core::{
    autoplay::AutoPlayer,
    board::face_index,
    config::{GameConfig, LayoutPreset},
    engine::MatchEngine,
    event::{EventLogEntry, GameEvent},
    listener::{GameListener, LogListener},
    store::{new_game_id, SaveStore},
    tile::{TileState, TransitionKind},
    types::{Seed, SlotIndex, Time},
};
use std::env;
use std::io::{self, BufRead, Write};

/// Faces available to the text renderer.
const FACES: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R',
];

/// Hard stop for batch runs, in logical seconds.
const MAX_RUN_TIME: Time = 3600.0;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Reveal { slot: SlotIndex },
    Advance { dt: Time },
    Pause,
    Resume,
    Save,
    Load,
    NewGame { rows: u32, cols: u32, seed: Option<Seed> },
    Quit,
}

#[derive(serde::Serialize)]
struct TileView {
    slot:  SlotIndex,
    state: Option<TileState>,
    face:  Option<char>,
}

#[derive(serde::Serialize)]
struct UiState {
    game_id:   String,
    now:       Time,
    rows:      u32,
    cols:      u32,
    seed:      Seed,
    score:     u32,
    combo:     u32,
    game_over: bool,
    paused:    bool,
    tiles:     Vec<TileView>,
    events:    Vec<GameEvent>,
}

/// Audio stand-in: logs the cue each event would play.
struct CueListener;

impl GameListener for CueListener {
    fn name(&self) -> &'static str { "cues" }

    fn on_event(&mut self, event: &GameEvent) {
        let cue = match event {
            GameEvent::TransitionStarted { token } if token.kind == TransitionKind::Reveal => "flip",
            GameEvent::PairMatched { .. }    => "match",
            GameEvent::PairMismatched { .. } => "mismatch",
            GameEvent::GameOver { .. }       => "game_over",
            _ => return,
        };
        log::info!("cue: {cue}");
    }
}

#[derive(Default)]
struct RunStats {
    picks:      u64,
    matches:    u64,
    mismatches: u64,
    best_combo: u32,
}

impl RunStats {
    fn absorb(&mut self, events: &[GameEvent]) -> u64 {
        let mut resolved = 0;
        for event in events {
            match event {
                GameEvent::PairMatched { .. } => {
                    self.matches += 1;
                    resolved += 1;
                }
                GameEvent::PairMismatched { .. } => {
                    self.mismatches += 1;
                    resolved += 1;
                }
                GameEvent::ComboChanged { combo } => self.best_combo = self.best_combo.max(*combo),
                _ => {}
            }
        }
        resolved
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = match find_arg(&args, "--config") {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let (preset_rows, preset_cols) = find_arg(&args, "--preset")
        .and_then(LayoutPreset::parse)
        .unwrap_or(config.default_layout)
        .dimensions();
    let rows = parse_arg(&args, "--rows", preset_rows);
    let cols = parse_arg(&args, "--cols", preset_cols);
    let seed = parse_arg(&args, "--seed", clock_seed());
    let recall = parse_arg(&args, "--recall", 0.8f64);
    let step = checked_step(parse_arg(&args, "--step", 0.05f64))?;
    let save_every = parse_arg(&args, "--save-every", 5u64);
    let db = find_arg(&args, "--db").unwrap_or(":memory:");
    let resume = args.iter().any(|a| a == "--resume");
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");

    let store = SaveStore::open(db)?;
    store.migrate()?;

    let mut engine = if resume {
        resume_latest(&store, config)?
    } else {
        let game_id = new_game_id();
        store.insert_game(&game_id, rows, cols, seed, env!("CARGO_PKG_VERSION"))?;
        MatchEngine::new_game(game_id, config, rows, cols, seed)?
    };
    engine.register_listener(Box::new(LogListener));
    engine.register_listener(Box::new(CueListener));

    if ipc_mode {
        run_ipc_loop(&mut engine, &store)?;
    } else {
        println!("Card Match: match-runner");
        println!("  game_id:  {}", engine.game_id);
        println!("  layout:   {}x{}", engine.board().rows(), engine.board().cols());
        println!("  seed:     {}", engine.board().seed());
        println!("  recall:   {recall}");
        println!("  db:       {db}");
        println!();
        print_board(&engine);

        let seed = engine.board().seed();
        let stats = run_batch(&mut engine, &store, AutoPlayer::new(seed, recall), step, save_every)?;
        print_summary(&engine, &stats);
    }

    Ok(())
}

/// Batch steps must move time forward, or the loop never ends.
fn checked_step(step: Time) -> Result<Time> {
    if !step.is_finite() || step <= 0.0 {
        anyhow::bail!("--step must be a positive number of seconds, got {step}");
    }
    Ok(step)
}

fn resume_latest(store: &SaveStore, config: GameConfig) -> Result<MatchEngine> {
    let game_id = store
        .latest_game()?
        .ok_or_else(|| anyhow::anyhow!("No saved game to resume"))?;
    let saved = store
        .latest_snapshot(&game_id)?
        .ok_or_else(|| anyhow::anyhow!("Game {game_id} has no snapshot"))?;
    log::info!("resuming {game_id} from snapshot saved at {}", saved.saved_at);
    Ok(MatchEngine::from_snapshot(game_id, config, &saved.snapshot)?)
}

fn run_batch(
    engine: &mut MatchEngine,
    store: &SaveStore,
    mut player: AutoPlayer,
    step: Time,
    save_every: u64,
) -> Result<RunStats> {
    let mut stats = RunStats::default();
    let mut since_save = 0;

    let events = engine.drain_events();
    record(store, engine, &events)?;
    player.observe(engine, &events);

    while !engine.is_game_over() {
        if engine.now() > MAX_RUN_TIME {
            log::warn!("run exceeded {MAX_RUN_TIME}s of logical time, stopping");
            break;
        }

        if let Some(slot) = player.next_pick(engine) {
            stats.picks += 1;
            let events = engine.request_reveal(slot)?;
            record(store, engine, &events)?;
        }

        let events = engine.advance(step)?;
        since_save += stats.absorb(&events);
        record(store, engine, &events)?;
        player.observe(engine, &events);

        // Periodic auto-save, as the game does when losing focus.
        if save_every > 0 && since_save >= save_every {
            store.save_snapshot(&engine.game_id, &engine.capture())?;
            since_save = 0;
        }
    }

    store.save_snapshot(&engine.game_id, &engine.capture())?;
    Ok(stats)
}

fn record(store: &SaveStore, engine: &MatchEngine, events: &[GameEvent]) -> Result<()> {
    for event in events {
        store.append_event(&EventLogEntry::new(&engine.game_id, engine.now(), event)?)?;
    }
    Ok(())
}

fn run_ipc_loop(engine: &mut MatchEngine, store: &SaveStore) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    let mut pending = engine.drain_events();
    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        match handle_command(engine, store, cmd) {
            Ok(events) => {
                pending.extend(events);
                record(store, engine, &pending)?;
                let state = build_ui_state(engine, std::mem::take(&mut pending));
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
            }
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(
    engine: &mut MatchEngine,
    store: &SaveStore,
    cmd: IpcCommand,
) -> Result<Vec<GameEvent>> {
    let events = match cmd {
        IpcCommand::GetState | IpcCommand::Quit => Vec::new(),
        IpcCommand::Reveal { slot } => engine.request_reveal(slot)?,
        IpcCommand::Advance { dt } => engine.advance(dt)?,
        IpcCommand::Pause => {
            engine.clock.pause();
            Vec::new()
        }
        IpcCommand::Resume => {
            engine.clock.resume();
            Vec::new()
        }
        IpcCommand::Save => {
            store.save_snapshot(&engine.game_id, &engine.capture())?;
            Vec::new()
        }
        IpcCommand::Load => {
            let saved = store
                .latest_snapshot(&engine.game_id)?
                .ok_or_else(|| anyhow::anyhow!("No save for game {}", engine.game_id))?;
            engine.restore(&saved.snapshot)?
        }
        IpcCommand::NewGame { rows, cols, seed } => {
            let seed = seed.unwrap_or_else(clock_seed);
            let game_id = new_game_id();
            let events = engine.start_new_game(game_id.clone(), rows, cols, seed)?;
            store.insert_game(&game_id, rows, cols, seed, env!("CARGO_PKG_VERSION"))?;
            events
        }
    };
    Ok(events)
}

fn build_ui_state(engine: &MatchEngine, events: Vec<GameEvent>) -> UiState {
    let board = engine.board();
    let tiles = board
        .slots()
        .iter()
        .enumerate()
        .map(|(slot, s)| {
            let tile = s.tile();
            let face_up = tile.is_some_and(|t| matches!(t.state(), TileState::Revealed | TileState::Matched));
            TileView {
                slot,
                state: tile.map(|t| t.state()),
                face: tile.filter(|_| face_up).and_then(|t| face_for(t.pair_id())),
            }
        })
        .collect();

    UiState {
        game_id: engine.game_id.clone(),
        now: engine.now(),
        rows: board.rows(),
        cols: board.cols(),
        seed: board.seed(),
        score: engine.score().score,
        combo: engine.score().combo,
        game_over: engine.is_game_over(),
        paused: engine.clock.paused,
        tiles,
        events,
    }
}

fn face_for(pair_id: u32) -> Option<char> {
    face_index(pair_id, FACES.len()).map(|i| FACES[i])
}

fn print_board(engine: &MatchEngine) {
    let board = engine.board();
    for row in board.slots().chunks(board.cols() as usize) {
        let line: Vec<String> = row
            .iter()
            .map(|s| match s.tile() {
                Some(t) => face_for(t.pair_id()).unwrap_or('?').to_string(),
                None => " ".to_string(),
            })
            .collect();
        println!("  {}", line.join(" "));
    }
    println!();
}

fn print_summary(engine: &MatchEngine, stats: &RunStats) {
    println!("=== RUN SUMMARY ===");
    println!("  game_id:      {}", engine.game_id);
    println!("  finished:     {}", engine.is_game_over());
    println!("  logical time: {:.2}s", engine.now());
    println!("  picks:        {}", stats.picks);
    println!("  matches:      {}", stats.matches);
    println!("  mismatches:   {}", stats.mismatches);
    println!("  best combo:   x{}", stats.best_combo);
    println!("  final score:  {}", engine.score().score);
    println!(
        "  matched:      {}/{}",
        engine.board().matched_count(),
        engine.board().tiles().count()
    );
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    find_arg(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Seed for runs that do not pass one.
fn clock_seed() -> Seed {
    chrono::Utc::now().timestamp_millis() as Seed
}
