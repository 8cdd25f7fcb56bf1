//! Ingest configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::IngestError;
use crate::pipeline::DEFAULT_CHUNK_SIZE;

pub const DEFAULT_DB_PATH: &str = "data/moves.sqlite";

#[derive(Clone, Debug)]
pub struct IngestConfig {
    /// Store file shared with the API server
    pub db_path: PathBuf,

    /// Personal API token for the live export
    pub lichess_token: Option<String>,

    /// Default player for the `player` subcommand
    pub lichess_username: Option<String>,

    /// Rows buffered before each batch insert
    pub chunk_size: usize,

    /// Stop after this many games have been read
    pub max_games: Option<u64>,
}

impl IngestConfig {
    /// Load configuration from environment variables. Call once at startup,
    /// after `dotenvy` has had a chance to populate the environment.
    pub fn from_env() -> Result<Self, IngestError> {
        let db_path = env::var("MOVES_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH));

        let lichess_token = non_empty_var("LICHESS_TOKEN");
        let lichess_username = non_empty_var("LICHESS_USERNAME");

        let chunk_size = parse_var("INGEST_CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(IngestError::Config("INGEST_CHUNK_SIZE must be at least 1".into()));
        }

        let max_games = parse_var("INGEST_MAX_GAMES")?;

        Ok(Self {
            db_path,
            lichess_token,
            lichess_username,
            chunk_size,
            max_games,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Unset is fine, set-but-garbage is a configuration error.
fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, IngestError> {
    match non_empty_var(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| IngestError::Config(format!("{name} is not a valid number: {raw:?}"))),
    }
}
