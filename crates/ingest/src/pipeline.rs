//! The ingestion loop: raw games in, batched `moves` rows out.
//!
//! One game is decoded, validated and extracted at a time. Rows accumulate
//! in a buffer that is flushed as a single transaction whenever it reaches
//! `chunk_size`, and once more at the end of the stream.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chess_core::{Extractor, IntoGameRecord};
use chrono::Utc;
use move_store::{IngestRun, IngestSource, MoveRow, MoveStore};
use tracing::{debug, error, info, warn};

use crate::archive::open_archive;
use crate::error::IngestError;
use crate::fingerprint::fingerprint_file;

pub const DEFAULT_CHUNK_SIZE: usize = 50_000;
pub const DEFAULT_PROGRESS_EVERY: u64 = 50_000;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub chunk_size: usize,
    /// Counts games read from the stream, whether or not they yield rows.
    pub max_games: Option<u64>,
    /// Log progress every this many games; 0 disables.
    pub progress_every: u64,
    pub source: IngestSource,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_games: None,
            progress_every: DEFAULT_PROGRESS_EVERY,
            source: IngestSource::Bulk,
        }
    }
}

/// Cooperative stop request, shared between the pipeline and whoever wants
/// it to finish early. Checked between games.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestSummary {
    pub games_read: u64,
    /// Games dropped for missing or unusable header data.
    pub games_skipped: u64,
    /// Games dropped for data that should not occur (e.g. an unknown result).
    pub games_failed: u64,
    pub rows_inserted: u64,
    pub elapsed: Duration,
    /// A [`StopFlag`] ended the run early.
    pub stopped: bool,
    /// `max_games` was reached with games still left in the stream.
    pub truncated: bool,
}

impl IngestSummary {
    /// The whole stream was consumed.
    pub fn is_complete(&self) -> bool {
        !self.stopped && !self.truncated
    }

    fn log(&self) {
        info!(
            games_read = self.games_read,
            games_skipped = self.games_skipped,
            games_failed = self.games_failed,
            rows_inserted = self.rows_inserted,
            elapsed_secs = self.elapsed.as_secs_f64(),
            stopped = self.stopped,
            truncated = self.truncated,
            "Ingest finished"
        );
    }
}

fn flush(store: &mut MoveStore, buffer: &mut Vec<MoveRow>) -> Result<u64, IngestError> {
    if buffer.is_empty() {
        return Ok(0);
    }
    let inserted = store.insert_batch(buffer)? as u64;
    buffer.clear();
    Ok(inserted)
}

/// Run every game from `games` through extraction into `store`.
///
/// Per-game problems are logged and counted; the stream carries on. An error
/// item from the stream itself, or a failed batch insert, aborts the run and
/// is returned. Rows of a batch that failed to insert are lost.
pub fn ingest_games<I, G, E>(
    store: &mut MoveStore,
    games: I,
    options: &IngestOptions,
    stop: &StopFlag,
) -> Result<IngestSummary, IngestError>
where
    I: IntoIterator<Item = Result<G, E>>,
    G: IntoGameRecord,
    IngestError: From<E>,
{
    let start = Instant::now();
    let chunk_size = options.chunk_size.max(1);
    let mut buffer: Vec<MoveRow> = Vec::with_capacity(chunk_size);
    let mut summary = IngestSummary::default();
    let mut games = games.into_iter().peekable();

    loop {
        if stop.is_raised() {
            warn!(games_read = summary.games_read, "Stop requested, finishing early");
            summary.stopped = true;
            break;
        }
        if options.max_games.is_some_and(|max| summary.games_read >= max) {
            summary.truncated = games.peek().is_some();
            break;
        }

        let Some(item) = games.next() else {
            break;
        };
        let game = item?;
        summary.games_read += 1;
        let index = summary.games_read;

        match game.into_record() {
            Ok(record) => {
                buffer.extend(
                    Extractor::new(&record).map(|obs| MoveRow::new(obs, options.source, &record.meta)),
                );
            }
            Err(e) if e.is_skip() => {
                debug!(game = index, error = %e, "Skipping game");
                summary.games_skipped += 1;
            }
            Err(e) => {
                error!(game = index, error = %e, "Failed to process game, skipping");
                summary.games_failed += 1;
            }
        }

        if buffer.len() >= chunk_size {
            summary.rows_inserted += flush(store, &mut buffer)?;
            debug!(rows_inserted = summary.rows_inserted, "Batch flushed");
        }

        if options.progress_every > 0 && index % options.progress_every == 0 {
            let secs = start.elapsed().as_secs_f64();
            let rate = if secs > 0.0 { index as f64 / secs } else { 0.0 };
            info!(
                games_read = index,
                rows_inserted = summary.rows_inserted,
                games_per_sec = rate as u64,
                "Progress"
            );
        }
    }

    summary.rows_inserted += flush(store, &mut buffer)?;
    summary.elapsed = start.elapsed();
    summary.log();

    Ok(summary)
}

/// Open the store at `db_path`, hand it to `work`, then close it whether or
/// not `work` succeeded. The first error wins.
pub fn with_store<T>(
    db_path: &Path,
    work: impl FnOnce(&mut MoveStore) -> Result<T, IngestError>,
) -> Result<T, IngestError> {
    let mut store = MoveStore::open(db_path)?;
    let result = work(&mut store);
    let closed = store.close();
    let value = result?;
    closed?;
    Ok(value)
}

/// What to do with an archive whose fingerprint is already in the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateGuard {
    /// Ingest again, appending duplicate rows.
    #[default]
    Allow,
    /// Leave the store untouched.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveOutcome {
    Ingested(IngestSummary),
    AlreadyIngested { fingerprint: String },
}

/// Ingest one archive file and, if it was read to the end, record it in the
/// ingest ledger.
pub fn ingest_archive(
    store: &mut MoveStore,
    path: &Path,
    options: &IngestOptions,
    stop: &StopFlag,
    guard: DuplicateGuard,
) -> Result<ArchiveOutcome, IngestError> {
    let fingerprint = fingerprint_file(path)?;

    if store.has_fingerprint(&fingerprint)? {
        match guard {
            DuplicateGuard::Skip => {
                info!(path = %path.display(), %fingerprint, "Archive already ingested, skipping");
                return Ok(ArchiveOutcome::AlreadyIngested { fingerprint });
            }
            DuplicateGuard::Allow => {
                warn!(path = %path.display(), %fingerprint, "Archive was ingested before, rows will be duplicated");
            }
        }
    }

    info!(path = %path.display(), "Ingesting archive");
    let games = open_archive(path)?;
    let summary = ingest_games(store, games, options, stop)?;

    if summary.is_complete() {
        store.record_run(&IngestRun {
            fingerprint,
            source_path: path.display().to_string(),
            games_read: summary.games_read,
            rows_inserted: summary.rows_inserted,
            finished_at: Utc::now(),
        })?;
    }

    Ok(ArchiveOutcome::Ingested(summary))
}
