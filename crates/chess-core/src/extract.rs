//! Per-ply event extraction.
//!
//! Replays a game's move tokens over a simulated board and yields one
//! [`MoveObservation`] per move, in ply order. The board lives only as long as
//! the [`Extractor`] for that game.

use std::sync::LazyLock;

use regex::Regex;
use shakmaty::{
    san::{San, SanPlus},
    uci::UciMove,
    Chess, Move, Position,
};
use tracing::debug;

use crate::game_data::{GameRecord, MoveObservation, Outcome, Side};
use crate::position::position_key;

static COORDINATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-h][1-8][a-h][1-8][qrbn]?$").unwrap());

const RESULT_MARKERS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

pub fn is_result_marker(token: &str) -> bool {
    RESULT_MARKERS.contains(&token)
}

/// Resolve a move token against `pos`. Coordinate notation is tried first,
/// then standard algebraic notation (check suffixes and annotation glyphs
/// are tolerated).
pub fn parse_move(pos: &Chess, token: &str) -> Option<Move> {
    if COORDINATE_RE.is_match(token) {
        let uci: UciMove = token.parse().ok()?;
        return uci.to_move(pos).ok();
    }

    let cleaned = token.trim_end_matches(['!', '?']);
    let san_plus: SanPlus = cleaned.parse().ok()?;
    san_plus.san.to_move(pos).ok()
}

/// Iterator over the observations of a single game.
pub struct Extractor<'a> {
    game: &'a GameRecord,
    tokens: std::slice::Iter<'a, String>,
    pos: Chess,
    ply: u32,
    average_rating: Option<i32>,
    finished: bool,
}

impl<'a> Extractor<'a> {
    pub fn new(game: &'a GameRecord) -> Self {
        Self {
            game,
            tokens: game.moves.iter(),
            pos: Chess::default(),
            ply: 0,
            average_rating: game.average_rating(),
            finished: false,
        }
    }

    fn finish(&mut self) -> Option<MoveObservation> {
        self.finished = true;
        None
    }
}

impl Iterator for Extractor<'_> {
    type Item = MoveObservation;

    fn next(&mut self) -> Option<MoveObservation> {
        if self.finished {
            return None;
        }

        let Some(token) = self.tokens.next() else {
            return self.finish();
        };
        let token = token.trim();

        if is_result_marker(token) {
            return self.finish();
        }

        let Some(mv) = parse_move(&self.pos, token) else {
            debug!(
                ply = self.ply + 1,
                token,
                game_id = self.game.meta.id.as_deref().unwrap_or(""),
                "Unparsable move, truncating game"
            );
            return self.finish();
        };

        let mover = Side::from(self.pos.turn());
        let fen_before = position_key(&self.pos);
        let san = San::from_move(&self.pos, mv.clone());

        self.pos.play_unchecked(mv);

        let suffix = if self.pos.is_checkmate() {
            "#"
        } else if self.pos.is_check() {
            "+"
        } else {
            ""
        };

        self.ply += 1;

        Some(MoveObservation {
            ply: self.ply,
            fen_before,
            move_san: format!("{san}{suffix}"),
            mover,
            player_rating: self.game.rating_of(mover),
            average_rating: self.average_rating,
            outcome: Outcome::for_mover(self.game.result, mover),
        })
    }
}

/// Collect every observation of a game.
pub fn extract_observations(game: &GameRecord) -> Vec<MoveObservation> {
    Extractor::new(game).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_data::{GameMeta, GameResult};
    use crate::position::{position_from_key, STARTING_POSITION_KEY};

    fn game(moves: &[&str], result: GameResult) -> GameRecord {
        GameRecord {
            white_rating: Some(1500),
            black_rating: Some(1400),
            result,
            moves: moves.iter().map(|s| s.to_string()).collect(),
            meta: GameMeta::default(),
        }
    }

    #[test]
    fn test_extract_basic_game() {
        let obs = extract_observations(&game(&["e4", "e5", "Nf3"], GameResult::WhiteWins));

        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].ply, 1);
        assert_eq!(obs[0].fen_before, STARTING_POSITION_KEY);
        assert_eq!(obs[0].mover, Side::White);
        assert_eq!(obs[0].outcome.score(), 1.0);
        assert_eq!(obs[0].player_rating, Some(1500));
        assert_eq!(obs[1].mover, Side::Black);
        assert_eq!(obs[1].outcome.score(), 0.0);
        assert_eq!(obs[1].player_rating, Some(1400));
        assert_eq!(obs[2].move_san, "Nf3");
        assert!(obs.iter().all(|o| o.average_rating == Some(1450)));
    }

    #[test]
    fn test_coordinate_tokens_are_rendered_as_san() {
        let obs = extract_observations(&game(&["e2e4", "e7e5", "g1f3", "b8c6"], GameResult::Draw));

        let sans: Vec<_> = obs.iter().map(|o| o.move_san.as_str()).collect();
        assert_eq!(sans, ["e4", "e5", "Nf3", "Nc6"]);
    }

    #[test]
    fn test_mixed_notation_and_check_suffix() {
        // Scholar's mate, half coordinate and half algebraic.
        let obs = extract_observations(&game(
            &["e4", "e7e5", "f1c4", "Nc6", "Qh5", "g8f6", "Qxf7#"],
            GameResult::WhiteWins,
        ));

        assert_eq!(obs.len(), 7);
        assert_eq!(obs[2].move_san, "Bc4");
        assert_eq!(obs[6].move_san, "Qxf7#");
    }

    #[test]
    fn test_bad_token_truncates_game() {
        let obs = extract_observations(&game(&["e4", "e5", "Ke3", "Nf3"], GameResult::WhiteWins));
        assert_eq!(obs.len(), 2);

        let obs = extract_observations(&game(&["e4", "garbage", "Nf3"], GameResult::WhiteWins));
        assert_eq!(obs.len(), 1);
    }

    #[test]
    fn test_result_marker_ends_game() {
        let obs = extract_observations(&game(&["e4", "e5", "1-0", "Nf3"], GameResult::WhiteWins));
        assert_eq!(obs.len(), 2);
    }

    #[test]
    fn test_annotation_glyphs_are_ignored() {
        let obs = extract_observations(&game(&["e4!", "e5?!", "Nf3"], GameResult::Draw));
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[1].move_san, "e5");
    }

    #[test]
    fn test_replay_reconstructs_next_position() {
        let obs = extract_observations(&game(
            &["d4", "d5", "c4", "e6", "Nc3", "Nf6", "Bg5", "Be7"],
            GameResult::Unknown,
        ));

        for pair in obs.windows(2) {
            assert_eq!(pair[1].ply, pair[0].ply + 1);
            let pos = position_from_key(&pair[0].fen_before).unwrap();
            let mv = parse_move(&pos, &pair[0].move_san).unwrap();
            let mut next = pos.clone();
            next.play_unchecked(mv);
            assert_eq!(position_key(&next), pair[1].fen_before);
        }
    }

    #[test]
    fn test_en_passant_square_only_when_capturable() {
        let obs = extract_observations(&game(&["e4", "a6", "e5", "d5", "exd6"], GameResult::Draw));

        // After 1.e4 no black pawn can capture on e3.
        assert!(obs[1].fen_before.ends_with(" -"));
        // After 2...d5 the e5 pawn can take en passant.
        assert!(obs[4].fen_before.ends_with(" d6"));
        assert_eq!(obs[4].move_san, "exd6");
    }
}
