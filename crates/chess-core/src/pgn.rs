//! Streaming reader for PGN archives.
//!
//! [`ArchiveReader`] pulls one game at a time out of any [`Read`] (typically a
//! decompressing stream) and hands back the few header fields the pipeline
//! needs plus the mainline moves as SAN tokens.

use std::io::{self, Read};
use std::ops::ControlFlow;

use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};

use crate::game_data::{GameError, GameMeta, GameRecord, GameResult, IntoGameRecord};
use crate::position::{normalize_fen, STARTING_POSITION_KEY};

/// A game as it appears in an archive, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveGame {
    pub white_elo: Option<String>,
    pub black_elo: Option<String>,
    pub result: Option<String>,
    pub site: Option<String>,
    pub event: Option<String>,
    pub variant: Option<String>,
    /// Starting position, only present for games set up from a custom FEN.
    pub fen: Option<String>,
    pub moves: Vec<String>,
}

/// Elo headers above this are treated as corrupt.
const MAX_RATING: i32 = 10_000;

fn parse_rating(header: &'static str, value: Option<String>) -> Result<i32, GameError> {
    let value = value.ok_or(GameError::MissingHeader(header))?;
    match value.trim().parse::<i32>() {
        Ok(rating) if (0..=MAX_RATING).contains(&rating) => Ok(rating),
        _ => Err(GameError::InvalidRating { header, value }),
    }
}

/// Lichess events read like "Rated Blitz game" or "Casual Rapid game".
fn parse_event(event: &str) -> (Option<bool>, Option<String>) {
    let mut words = event.split_whitespace();
    let rated = match words.next() {
        Some("Rated") => Some(true),
        Some("Casual") => Some(false),
        _ => return (None, None),
    };
    let speed = words.next().map(|w| w.to_lowercase());
    (rated, speed)
}

impl IntoGameRecord for ArchiveGame {
    /// Both ratings and a decisive or drawn result are required.
    fn into_record(self) -> Result<GameRecord, GameError> {
        let white_rating = parse_rating("WhiteElo", self.white_elo)?;
        let black_rating = parse_rating("BlackElo", self.black_elo)?;

        let result_str = self.result.ok_or(GameError::MissingHeader("Result"))?;
        let result =
            GameResult::from_pgn(&result_str).ok_or(GameError::UnrecognizedResult(result_str))?;

        if let Some(fen) = &self.fen {
            if normalize_fen(fen) != STARTING_POSITION_KEY {
                return Err(GameError::NonStandardStart);
            }
        }

        let (rated, speed) = self
            .event
            .as_deref()
            .map(parse_event)
            .unwrap_or((None, None));

        let meta = GameMeta {
            id: self
                .site
                .as_deref()
                .and_then(|site| site.rsplit('/').next())
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            rated,
            variant: Some(
                self.variant
                    .map(|v| v.to_lowercase())
                    .unwrap_or_else(|| "standard".to_string()),
            ),
            speed,
        };

        Ok(GameRecord {
            white_rating: Some(white_rating),
            black_rating: Some(black_rating),
            result,
            moves: self.moves,
            meta,
        })
    }
}

/// Visitor that copies headers and mainline SAN into an [`ArchiveGame`].
#[derive(Default)]
struct GameCollector;

impl Visitor for GameCollector {
    type Tags = ArchiveGame;
    type Movetext = ArchiveGame;
    type Output = ArchiveGame;

    fn begin_tags(&mut self) -> ControlFlow<ArchiveGame, ArchiveGame> {
        ControlFlow::Continue(ArchiveGame::default())
    }

    fn tag(
        &mut self,
        tags: &mut ArchiveGame,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<ArchiveGame> {
        let slot = match name {
            b"WhiteElo" => &mut tags.white_elo,
            b"BlackElo" => &mut tags.black_elo,
            b"Result" => &mut tags.result,
            b"Site" => &mut tags.site,
            b"Event" => &mut tags.event,
            b"Variant" => &mut tags.variant,
            b"FEN" => &mut tags.fen,
            _ => return ControlFlow::Continue(()),
        };
        *slot = Some(value.decode_utf8_lossy().into_owned());
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: ArchiveGame) -> ControlFlow<ArchiveGame, ArchiveGame> {
        ControlFlow::Continue(tags)
    }

    fn san(&mut self, game: &mut ArchiveGame, san_plus: SanPlus) -> ControlFlow<ArchiveGame> {
        game.moves.push(san_plus.to_string());
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _game: &mut ArchiveGame) -> ControlFlow<ArchiveGame, Skip> {
        // Mainline only.
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, game: ArchiveGame) -> ArchiveGame {
        game
    }
}

/// Iterator of games over a PGN byte stream. Holds at most one game at a time.
pub struct ArchiveReader<R: Read> {
    reader: Reader<R>,
    collector: GameCollector,
}

impl<R: Read> ArchiveReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            reader: Reader::new(input),
            collector: GameCollector,
        }
    }
}

impl<R: Read> Iterator for ArchiveReader<R> {
    type Item = io::Result<ArchiveGame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_game(&mut self.collector).transpose()
    }
}
