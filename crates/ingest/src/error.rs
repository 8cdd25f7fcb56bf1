//! Ingest error types

use thiserror::Error;

/// Run-level failures. Anything here aborts the run; per-game problems are
/// [`chess_core::GameError`]s and never leave the pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] move_store::Error),

    #[error("Lichess error: {0}")]
    Lichess(String),

    #[error("Invalid archive pattern: {0}")]
    Glob(#[from] glob::PatternError),
}
