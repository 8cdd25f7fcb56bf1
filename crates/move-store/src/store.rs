//! [`MoveStore`] — a single explicitly owned SQLite handle.

use std::path::Path;

use chess_core::{GameMeta, MoveObservation, Side};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension as _};
use tracing::debug;

use crate::{schema::SCHEMA, Result};

/// Which ingestion path produced a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestSource {
    /// Bulk archive, filed under the players' average rating.
    Bulk,
    /// Live per-player export, filed under the mover's own rating.
    Player,
}

impl IngestSource {
    pub fn as_str(self) -> &'static str {
        match self {
            IngestSource::Bulk => "bulk",
            IngestSource::Player => "player",
        }
    }
}

/// A row of the `moves` table.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveRow {
    pub ply: u32,
    pub fen_before: String,
    pub move_san: String,
    pub mover: Side,
    pub average_rating: Option<i32>,
    pub player_rating: Option<i32>,
    pub mover_score: u8,
    pub source: IngestSource,
    pub game_id: Option<String>,
    pub rated: Option<bool>,
    pub variant: Option<String>,
    pub speed: Option<String>,
}

impl MoveRow {
    pub fn new(obs: MoveObservation, source: IngestSource, meta: &GameMeta) -> Self {
        Self {
            ply: obs.ply,
            fen_before: obs.fen_before,
            move_san: obs.move_san,
            mover: obs.mover,
            average_rating: obs.average_rating,
            player_rating: obs.player_rating,
            mover_score: obs.outcome.half_points(),
            source,
            game_id: meta.id.clone(),
            rated: meta.rated,
            variant: meta.variant.clone(),
            speed: meta.speed.clone(),
        }
    }
}

/// One finished archive ingest, kept so repeated runs can be detected.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRun {
    /// Hex SHA-256 of the archive file.
    pub fingerprint: String,
    pub source_path: String,
    pub games_read: u64,
    pub rows_inserted: u64,
    pub finished_at: DateTime<Utc>,
}

const INSERT_MOVE: &str = "INSERT INTO moves (
    ply, fen_before, move_san, mover, average_rating, player_rating,
    mover_score, source, game_id, rated, variant, speed
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

pub struct MoveStore {
    conn: Connection,
}

impl MoveStore {
    /// Open (or create) a store at `path` and make sure the schema exists.
    ///
    /// The file is switched to WAL so read-only handles can query while a
    /// writer is appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;
        debug!(path = %path.display(), journal_mode = %mode, "Opened move store");
        Ok(Self { conn })
    }

    /// Open an existing store for queries only. Never takes a write lock.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// In-memory store, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Append a batch in a single transaction: either every row lands or none do.
    pub fn insert_batch(&mut self, rows: &[MoveRow]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(INSERT_MOVE)?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.ply,
                    row.fen_before,
                    row.move_san,
                    row.mover.as_str(),
                    row.average_rating,
                    row.player_rating,
                    row.mover_score,
                    row.source.as_str(),
                    row.game_id,
                    row.rated,
                    row.variant,
                    row.speed,
                ])?;
            }
        }
        tx.commit()?;
        debug!(rows = rows.len(), "Committed batch");
        Ok(rows.len())
    }

    pub fn row_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM moves", [], |r| r.get(0))?;
        Ok(count as u64)
    }

    pub fn record_run(&self, run: &IngestRun) -> Result<()> {
        self.conn.execute(
            "INSERT INTO ingest_runs (fingerprint, source_path, games_read, rows_inserted, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                run.fingerprint,
                run.source_path,
                run.games_read as i64,
                run.rows_inserted as i64,
                run.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Whether an archive with this fingerprint was ingested before.
    pub fn has_fingerprint(&self, fingerprint: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM ingest_runs WHERE fingerprint = ?1 LIMIT 1",
                [fingerprint],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Close the connection, surfacing any error SQLite reports on the way out.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}
