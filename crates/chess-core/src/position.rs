//! Canonical position keys.
//!
//! A key is the first four FEN fields: piece placement, side to move,
//! castling rights and en-passant square. The halfmove clock and fullmove
//! number are dropped so transpositions with different counters group together.

use shakmaty::{fen::Fen, CastlingMode, Chess, EnPassantMode};

/// Key of the standard initial position.
pub const STARTING_POSITION_KEY: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -";

/// Key for a simulated board. The en-passant square is only written when a
/// capture on it is actually legal.
pub fn position_key(pos: &Chess) -> String {
    let fen = Fen::from_position(pos, EnPassantMode::Legal);
    normalize_fen(&fen.to_string())
}

/// Strips move counters from a FEN, keeping only position + side + castling + ep.
pub fn normalize_fen(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Rebuild a board from a key (or a full FEN). Returns `None` for anything
/// that is not a legal standard-chess position.
pub fn position_from_key(key: &str) -> Option<Chess> {
    let fen_str = format!("{} 0 1", normalize_fen(key));
    let fen: Fen = fen_str.parse().ok()?;
    fen.into_position(CastlingMode::Standard).ok()
}

/// Key for any FEN, with the en-passant field rewritten the way
/// [`position_key`] writes it. `None` if the FEN does not parse.
pub fn canonical_key(fen: &str) -> Option<String> {
    position_from_key(fen).map(|pos| position_key(&pos))
}
