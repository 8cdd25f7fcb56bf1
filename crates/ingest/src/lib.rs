//! Game ingestion: bulk PGN archives and per-player live exports, both
//! streamed through move extraction into a [`move_store::MoveStore`].

pub mod archive;
pub mod clients;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod pipeline;

pub use error::IngestError;
pub use pipeline::{
    ingest_archive, ingest_games, with_store, ArchiveOutcome, DuplicateGuard, IngestOptions,
    IngestSummary, StopFlag,
};
