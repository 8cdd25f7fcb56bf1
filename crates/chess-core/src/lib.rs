//! Chess game records and per-move event extraction.
//!
//! Everything here is synchronous and storage-agnostic: a game goes in, a
//! sequence of [`MoveObservation`]s comes out.

pub mod extract;
pub mod game_data;
pub mod pgn;
pub mod position;

pub use extract::{extract_observations, Extractor};
pub use game_data::{
    GameError, GameMeta, GameRecord, GameResult, IntoGameRecord, MoveObservation, Outcome, Side,
};
pub use pgn::{ArchiveGame, ArchiveReader};
