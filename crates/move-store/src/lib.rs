//! Embedded storage for move observations and the aggregation queries over it.
//!
//! The `moves` table is append-only. Aggregation is read-only and can run
//! from a separate read-only handle while an ingest is appending.

pub mod aggregate;
pub mod bracket;
pub mod error;
mod schema;
mod store;

pub use aggregate::{
    stats_by_bracket, top_moves, BracketMoveStat, BracketQuery, RankedMoveStat, RatingColumn,
    TopMovesQuery,
};
pub use bracket::{rating_bracket, RatingBracket, DEFAULT_BRACKET_WIDTH};
pub use error::{Error, Result};
pub use store::{IngestRun, IngestSource, MoveRow, MoveStore};
