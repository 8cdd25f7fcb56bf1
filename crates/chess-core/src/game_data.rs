use std::fmt;

use serde::{Deserialize, Serialize};

/// The side that made a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

impl From<shakmaty::Color> for Side {
    fn from(color: shakmaty::Color) -> Self {
        match color {
            shakmaty::Color::White => Side::White,
            shakmaty::Color::Black => Side::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    /// No winner recorded (aborted, ongoing, or simply missing).
    Unknown,
}

impl GameResult {
    /// Parse a PGN `Result` tag. Only the three terminal results are accepted.
    pub fn from_pgn(result: &str) -> Option<Self> {
        match result {
            "1-0" => Some(GameResult::WhiteWins),
            "0-1" => Some(GameResult::BlackWins),
            "1/2-1/2" => Some(GameResult::Draw),
            _ => None,
        }
    }

    /// Map the `winner` field of a live game export.
    pub fn from_winner(winner: Option<&str>) -> Self {
        match winner {
            Some("white") => GameResult::WhiteWins,
            Some("black") => GameResult::BlackWins,
            Some("draw") => GameResult::Draw,
            _ => GameResult::Unknown,
        }
    }
}

/// Outcome of a game from the point of view of one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Loss,
    Draw,
    Win,
}

impl Outcome {
    /// Draws and games without a known winner both count as half a point.
    pub fn for_mover(result: GameResult, mover: Side) -> Self {
        match (result, mover) {
            (GameResult::WhiteWins, Side::White) | (GameResult::BlackWins, Side::Black) => {
                Outcome::Win
            }
            (GameResult::WhiteWins, Side::Black) | (GameResult::BlackWins, Side::White) => {
                Outcome::Loss
            }
            (GameResult::Draw, _) | (GameResult::Unknown, _) => Outcome::Draw,
        }
    }

    pub fn score(self) -> f64 {
        f64::from(self.half_points()) / 2.0
    }

    /// Stored encoding: 2 = win, 1 = draw, 0 = loss.
    pub fn half_points(self) -> u8 {
        match self {
            Outcome::Loss => 0,
            Outcome::Draw => 1,
            Outcome::Win => 2,
        }
    }

}

/// Optional per-game metadata carried through to storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMeta {
    pub id: Option<String>,
    pub rated: Option<bool>,
    pub variant: Option<String>,
    pub speed: Option<String>,
}

/// A finished game, validated at the boundary of whichever source produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub white_rating: Option<i32>,
    pub black_rating: Option<i32>,
    pub result: GameResult,
    /// Move tokens in coordinate ("e2e4") or algebraic ("e4") notation.
    pub moves: Vec<String>,
    pub meta: GameMeta,
}

impl GameRecord {
    pub fn rating_of(&self, side: Side) -> Option<i32> {
        match side {
            Side::White => self.white_rating,
            Side::Black => self.black_rating,
        }
    }

    /// Floor of the mean of both ratings.
    pub fn average_rating(&self) -> Option<i32> {
        match (self.white_rating, self.black_rating) {
            (Some(white), Some(black)) => {
                let mean = (i64::from(white) + i64::from(black)).div_euclid(2);
                // The mean of two i32 values always fits back into i32.
                Some(mean as i32)
            }
            _ => None,
        }
    }
}

/// One ply of one game: the position, the move played from it, and how the
/// game ended for the player who played it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveObservation {
    /// 1-based.
    pub ply: u32,
    /// Canonical position key (FEN without move counters).
    pub fen_before: String,
    pub move_san: String,
    pub mover: Side,
    pub player_rating: Option<i32>,
    pub average_rating: Option<i32>,
    pub outcome: Outcome,
}

/// Why a raw game could not become a [`GameRecord`].
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("invalid {header} value: {value:?}")]
    InvalidRating { header: &'static str, value: String },

    #[error("no result for game: {0:?}")]
    UnrecognizedResult(String),

    #[error("game has no player data")]
    MissingPlayers,

    #[error("game does not start from the standard position")]
    NonStandardStart,
}

impl GameError {
    /// Expected gaps in the source data, as opposed to games that should not exist.
    pub fn is_skip(&self) -> bool {
        !matches!(self, GameError::UnrecognizedResult(_))
    }
}

/// A raw game from some source that can be validated into a [`GameRecord`].
pub trait IntoGameRecord {
    fn into_record(self) -> Result<GameRecord, GameError>;
}

impl IntoGameRecord for GameRecord {
    fn into_record(self) -> Result<GameRecord, GameError> {
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_for_every_result_and_side() {
        let cases = [
            (GameResult::WhiteWins, Side::White, 1.0),
            (GameResult::WhiteWins, Side::Black, 0.0),
            (GameResult::BlackWins, Side::White, 0.0),
            (GameResult::BlackWins, Side::Black, 1.0),
            (GameResult::Draw, Side::White, 0.5),
            (GameResult::Draw, Side::Black, 0.5),
            (GameResult::Unknown, Side::White, 0.5),
            (GameResult::Unknown, Side::Black, 0.5),
        ];

        for (result, side, expected) in cases {
            assert_eq!(
                Outcome::for_mover(result, side).score(),
                expected,
                "{result:?} for {side:?}"
            );
        }
    }

    #[test]
    fn test_result_parsing() {
        assert_eq!(GameResult::from_pgn("1-0"), Some(GameResult::WhiteWins));
        assert_eq!(GameResult::from_pgn("0-1"), Some(GameResult::BlackWins));
        assert_eq!(GameResult::from_pgn("1/2-1/2"), Some(GameResult::Draw));
        assert_eq!(GameResult::from_pgn("*"), None);
        assert_eq!(GameResult::from_winner(Some("black")), GameResult::BlackWins);
        assert_eq!(GameResult::from_winner(None), GameResult::Unknown);
    }

    #[test]
    fn test_average_rating_floors() {
        let mut game = GameRecord {
            white_rating: Some(1501),
            black_rating: Some(1400),
            result: GameResult::Draw,
            moves: vec![],
            meta: GameMeta::default(),
        };
        assert_eq!(game.average_rating(), Some(1450));

        game.black_rating = None;
        assert_eq!(game.average_rating(), None);
        assert_eq!(game.rating_of(Side::White), Some(1501));
    }

    #[test]
    fn test_average_rating_of_extreme_values() {
        let game = GameRecord {
            white_rating: Some(i32::MAX),
            black_rating: Some(i32::MAX - 1),
            result: GameResult::Draw,
            moves: vec![],
            meta: GameMeta::default(),
        };
        assert_eq!(game.average_rating(), Some(i32::MAX - 1));

        let game = GameRecord {
            white_rating: Some(i32::MIN),
            black_rating: Some(-1),
            ..game
        };
        assert_eq!(game.average_rating(), Some(i32::MIN / 2 - 1));
    }
}
