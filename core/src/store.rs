//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The engine never touches storage; callers hand events and snapshots in.

use crate::{
    error::MatchResult,
    event::EventLogEntry,
    snapshot::Snapshot,
    types::Seed,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// A saved snapshot with the moment it was written.
#[derive(Debug, Clone)]
pub struct SavedSnapshot {
    pub game_id:  String,
    pub saved_at: DateTime<Utc>,
    pub snapshot: Snapshot,
}

pub struct SaveStore {
    conn: Connection,
}

impl SaveStore {
    /// Open (or create) the save database at `path`.
    pub fn open(path: &str) -> MatchResult<Self> {
        let conn = Connection::open(path)?;
        // :memory: answers "memory" rather than failing.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> MatchResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> MatchResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Game ───────────────────────────────────────────────────

    pub fn insert_game(
        &self,
        game_id: &str,
        rows: u32,
        cols: u32,
        seed: Seed,
        version: &str,
    ) -> MatchResult<()> {
        self.conn.execute(
            "INSERT INTO game (game_id, rows, cols, seed, version, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                game_id,
                rows,
                cols,
                seed as i64,
                version,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recently started game, if any.
    pub fn latest_game(&self) -> MatchResult<Option<String>> {
        let game_id = self
            .conn
            .query_row(
                "SELECT game_id FROM game ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(game_id)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> MatchResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (game_id, at, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.game_id, entry.at, entry.event_type, entry.payload],
        )?;
        Ok(())
    }

    pub fn events_for_game(&self, game_id: &str) -> MatchResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, game_id, at, event_type, payload
             FROM event_log WHERE game_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![game_id], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    game_id:    row.get(1)?,
                    at:         row.get(2)?,
                    event_type: row.get(3)?,
                    payload:    row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(&self, game_id: &str, snapshot: &Snapshot) -> MatchResult<DateTime<Utc>> {
        let saved_at = Utc::now();
        self.conn.execute(
            "INSERT INTO snapshot (game_id, saved_at, state_json) VALUES (?1, ?2, ?3)",
            params![game_id, saved_at.to_rfc3339(), snapshot.to_json()?],
        )?;
        log::info!("store: snapshot saved for {game_id} (score {})", snapshot.score);
        Ok(saved_at)
    }

    /// The last snapshot written for `game_id`. Decoding failures surface
    /// as InvalidSnapshot.
    pub fn latest_snapshot(&self, game_id: &str) -> MatchResult<Option<SavedSnapshot>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT saved_at, state_json FROM snapshot
                 WHERE game_id = ?1
                 ORDER BY id DESC LIMIT 1",
                params![game_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((saved_at, json)) = row else {
            return Ok(None);
        };
        let saved_at = DateTime::parse_from_rfc3339(&saved_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(anyhow::Error::from)?;
        Ok(Some(SavedSnapshot {
            game_id: game_id.to_string(),
            saved_at,
            snapshot: Snapshot::from_json(&json)?,
        }))
    }
}

/// Fresh random game identifier.
pub fn new_game_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
