//! Export the top-K move table to a JSON file.
//!
//! Usage: cargo run --bin export-stats -- --out data/top_moves.json [--min-rating 800] [--max-rating 1200]
//!
//! Reads MOVES_DB_PATH unless --db is given.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use move_store::{top_moves, MoveStore, RatingColumn, TopMovesQuery};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "export-stats", about = "Write ranked moves per position as a JSON array")]
struct Args {
    /// Store file
    #[arg(long, env = "MOVES_DB_PATH", default_value = "data/moves.sqlite")]
    db: PathBuf,

    /// Output file
    #[arg(long, default_value = "data/top_moves.json")]
    out: PathBuf,

    #[arg(long, default_value_t = 800)]
    min_rating: i32,

    #[arg(long, default_value_t = 1200)]
    max_rating: i32,

    #[arg(long, default_value_t = 15)]
    k: u32,

    #[arg(long, default_value_t = 5)]
    min_samples: u32,

    /// Filter on the mover's own rating instead of the game average
    #[arg(long)]
    player_rating: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let query = TopMovesQuery {
        min_rating: args.min_rating,
        max_rating: args.max_rating,
        k: args.k,
        min_samples_move: args.min_samples,
        rating_column: if args.player_rating {
            RatingColumn::PlayerRating
        } else {
            RatingColumn::AverageRating
        },
        position: None,
    };

    let store = MoveStore::open_read_only(&args.db)
        .with_context(|| format!("opening {}", args.db.display()))?;

    tracing::info!(?query, "Querying top moves");
    let stats = top_moves(&store, &query)?;
    store.close()?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(&args.out)?);
    serde_json::to_writer_pretty(&mut writer, &stats)?;
    writer.flush()?;

    let positions = stats.iter().filter(|s| s.rank == 1).count();
    tracing::info!(
        rows = stats.len(),
        positions,
        path = %args.out.display(),
        "Export complete"
    );

    Ok(())
}
