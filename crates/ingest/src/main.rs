//! Move statistics ingester
//!
//! Loads games into the move store, either from bulk PGN archives
//! (`.pgn` or `.pgn.zst`) or from one player's Lichess export.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ingest::archive::find_archives;
use ingest::clients::lichess::{read_export, LichessClient};
use ingest::config::IngestConfig;
use ingest::pipeline::DEFAULT_PROGRESS_EVERY;
use ingest::{
    ingest_archive, ingest_games, with_store, ArchiveOutcome, DuplicateGuard, IngestError,
    IngestOptions, StopFlag,
};
use move_store::{IngestSource, MoveStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ingest", about = "Load chess games into the move statistics store")]
struct Cli {
    /// Store file [env: MOVES_DB_PATH]
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Rows per batch insert [env: INGEST_CHUNK_SIZE]
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Stop after reading this many games [env: INGEST_MAX_GAMES]
    #[arg(long, global = true)]
    max_games: Option<u64>,

    /// Log progress every N games (0 disables)
    #[arg(long, global = true, default_value_t = DEFAULT_PROGRESS_EVERY)]
    progress_every: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bulk archives, filed under the players' average rating
    Archive {
        /// Archive files
        #[arg(required_unless_present = "dir", conflicts_with = "dir")]
        paths: Vec<PathBuf>,

        /// Ingest every *.pgn.zst and *.pgn file in this directory
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Skip archives whose content was ingested before
        #[arg(long)]
        skip_ingested: bool,
    },
    /// One player's games, filed under the mover's own rating
    Player {
        /// Lichess username [env: LICHESS_USERNAME]
        username: Option<String>,

        /// Read a saved NDJSON export instead of calling the API
        #[arg(long, conflicts_with = "save")]
        from_file: Option<PathBuf>,

        /// Also write the fetched NDJSON export to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = IngestConfig::from_env()?;

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path.clone());
    let chunk_size = cli.chunk_size.unwrap_or(config.chunk_size);
    if chunk_size == 0 {
        bail!("--chunk-size must be at least 1");
    }
    let max_games = cli.max_games.or(config.max_games);

    let stop = StopFlag::new();
    tokio::spawn({
        let stop = stop.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current game");
                stop.raise();
            }
        }
    });

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating store directory {}", parent.display()))?;
    }
    info!(db = %db_path.display(), chunk_size, ?max_games, "Opening move store");

    match cli.command {
        Command::Archive {
            paths,
            dir,
            skip_ingested,
        } => {
            let paths = match dir {
                Some(dir) => find_archives(&dir)?,
                None => paths,
            };
            if paths.is_empty() {
                bail!("no archives to ingest");
            }
            info!(archives = paths.len(), "Found archives");

            let options = IngestOptions {
                chunk_size,
                max_games,
                progress_every: cli.progress_every,
                source: IngestSource::Bulk,
            };
            let guard = if skip_ingested {
                DuplicateGuard::Skip
            } else {
                DuplicateGuard::Allow
            };

            tokio::task::spawn_blocking(move || {
                with_store(&db_path, |store| run_archives(store, &paths, options, &stop, guard))
            })
            .await??;
        }
        Command::Player {
            username,
            from_file,
            save,
        } => {
            let games = match from_file {
                Some(path) => {
                    info!(path = %path.display(), "Reading saved export");
                    read_export(BufReader::new(File::open(&path)?))?
                }
                None => {
                    let username = username
                        .or(config.lichess_username.clone())
                        .context("no username given and LICHESS_USERNAME is not set")?;
                    let client = LichessClient::new(config.lichess_token.clone())?;
                    let text = client.fetch_user_export(&username, max_games).await?;
                    if let Some(path) = save {
                        fs::write(&path, &text)
                            .with_context(|| format!("saving export to {}", path.display()))?;
                        info!(path = %path.display(), "Saved export");
                    }
                    ingest::clients::lichess::parse_export(&text)
                }
            };
            info!(games = games.len(), "Player games loaded");

            let options = IngestOptions {
                chunk_size,
                max_games,
                progress_every: cli.progress_every,
                source: IngestSource::Player,
            };

            tokio::task::spawn_blocking(move || {
                with_store(&db_path, |store| {
                    let items = games.into_iter().map(Ok::<_, IngestError>);
                    ingest_games(store, items, &options, &stop).map(drop)
                })
            })
            .await??;
        }
    }

    Ok(())
}

/// Ingest archives in order, with `max_games` spread across all of them.
fn run_archives(
    store: &mut MoveStore,
    paths: &[PathBuf],
    mut options: IngestOptions,
    stop: &StopFlag,
    guard: DuplicateGuard,
) -> Result<(), IngestError> {
    let mut games_read = 0u64;
    let mut rows_inserted = 0u64;
    let cap = options.max_games;

    for path in paths {
        if stop.is_raised() {
            break;
        }
        if let Some(cap) = cap {
            if games_read >= cap {
                break;
            }
            options.max_games = Some(cap - games_read);
        }

        match ingest_archive(store, path, &options, stop, guard)? {
            ArchiveOutcome::Ingested(summary) => {
                games_read += summary.games_read;
                rows_inserted += summary.rows_inserted;
            }
            ArchiveOutcome::AlreadyIngested { .. } => {}
        }
    }

    info!(
        archives = paths.len(),
        games_read,
        rows_inserted,
        total_rows = store.row_count()?,
        "All archives done"
    );
    Ok(())
}
