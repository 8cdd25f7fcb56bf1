use std::io::BufRead;
use std::time::Duration;

use chess_core::position::{normalize_fen, STARTING_POSITION_KEY};
use chess_core::{GameError, GameMeta, GameRecord, GameResult, IntoGameRecord};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::IngestError;

const API_BASE: &str = "https://lichess.org";

/// One game from the `/api/games/user` NDJSON export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedGame {
    pub id: Option<String>,
    pub rated: Option<bool>,
    pub variant: Option<String>,
    pub speed: Option<String>,
    pub players: Option<ExportedPlayers>,
    /// `"white"`, `"black"`, or absent for draws and unfinished games.
    pub winner: Option<String>,
    /// Space-separated moves.
    #[serde(default)]
    pub moves: String,
    pub initial_fen: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedPlayers {
    pub white: Option<ExportedPlayer>,
    pub black: Option<ExportedPlayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedPlayer {
    pub rating: Option<i32>,
    pub user: Option<ExportedUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedUser {
    pub name: String,
}

impl IntoGameRecord for ExportedGame {
    /// Both players must be present. A missing rating is kept as unknown
    /// rather than rejecting the game.
    fn into_record(self) -> Result<GameRecord, GameError> {
        let players = self.players.ok_or(GameError::MissingPlayers)?;
        let (white, black) = match (players.white, players.black) {
            (Some(white), Some(black)) => (white, black),
            _ => return Err(GameError::MissingPlayers),
        };

        if let Some(fen) = &self.initial_fen {
            if normalize_fen(fen) != STARTING_POSITION_KEY {
                return Err(GameError::NonStandardStart);
            }
        }

        Ok(GameRecord {
            white_rating: white.rating,
            black_rating: black.rating,
            result: GameResult::from_winner(self.winner.as_deref()),
            moves: self.moves.split_whitespace().map(str::to_string).collect(),
            meta: GameMeta {
                id: self.id,
                rated: self.rated,
                variant: self.variant,
                speed: self.speed,
            },
        })
    }
}

/// Parse NDJSON export lines. Malformed lines are logged and dropped.
pub fn parse_export(text: &str) -> Vec<ExportedGame> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| parse_line(i + 1, line))
        .collect()
}

/// Same as [`parse_export`], for a saved export file.
pub fn read_export(reader: impl BufRead) -> Result<Vec<ExportedGame>, IngestError> {
    let mut games = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        if let Some(game) = parse_line(i + 1, &line?) {
            games.push(game);
        }
    }
    Ok(games)
}

fn parse_line(line_no: usize, line: &str) -> Option<ExportedGame> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(game) => Some(game),
        Err(e) => {
            warn!(line = line_no, error = %e, "Failed to parse Lichess game JSON");
            None
        }
    }
}

pub struct LichessClient {
    client: Client,
    token: Option<String>,
}

impl LichessClient {
    pub fn new(token: Option<String>) -> Result<Self, IngestError> {
        let client = Client::builder()
            .user_agent("opening-stats/0.1")
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| IngestError::Lichess(format!("Client build error: {e}")))?;
        Ok(Self { client, token })
    }

    /// Fetch a player's games, newest first, as they come out of the export.
    /// Returns the raw NDJSON body so callers can keep a copy.
    pub async fn fetch_user_export(
        &self,
        username: &str,
        max_games: Option<u64>,
    ) -> Result<String, IngestError> {
        let url = format!("{API_BASE}/api/games/user/{username}");

        let mut params = vec![("moves", "true".to_string()), ("pgnInJson", "false".to_string())];
        if let Some(max) = max_games {
            params.push(("max", max.to_string()));
        }

        let mut request = self
            .client
            .get(&url)
            .query(&params)
            .header("Accept", "application/x-ndjson");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| IngestError::Lichess(format!("Request error: {e}")))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IngestError::Lichess(format!("User not found: {username}")));
        }

        if !resp.status().is_success() {
            return Err(IngestError::Lichess(format!("HTTP {}", resp.status())));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| IngestError::Lichess(format!("Body read error: {e}")))?;

        info!(username, bytes = text.len(), "Fetched Lichess export");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::extract_observations;

    const EXPORT: &str = r#"{"id":"q7ZvsdUF","rated":true,"variant":"standard","speed":"blitz","players":{"white":{"user":{"name":"alice"},"rating":1500},"black":{"user":{"name":"bob"},"rating":1420}},"winner":"black","moves":"e4 e5 Qh5 Nc6 Bc4 Nf6"}
not json
{"id":"aborted1","rated":false,"variant":"standard","speed":"rapid","players":{"white":{"rating":1300},"black":{}},"moves":"d4"}

{"id":"nopl","moves":"e4"}
"#;

    #[test]
    fn test_parse_export_skips_malformed_lines() {
        let games = parse_export(EXPORT);
        let ids: Vec<_> = games.iter().map(|g| g.id.as_deref().unwrap()).collect();
        assert_eq!(ids, ["q7ZvsdUF", "aborted1", "nopl"]);
        assert_eq!(
            games[0].players.as_ref().unwrap().white.as_ref().unwrap().user,
            Some(ExportedUser { name: "alice".into() })
        );
    }

    #[test]
    fn test_read_export_matches_parse_export() {
        let from_reader = read_export(EXPORT.as_bytes()).unwrap();
        assert_eq!(from_reader, parse_export(EXPORT));
    }

    #[test]
    fn test_exported_game_into_record() {
        let game = parse_export(EXPORT).remove(0);
        let record = game.into_record().unwrap();

        assert_eq!(record.white_rating, Some(1500));
        assert_eq!(record.black_rating, Some(1420));
        assert_eq!(record.result, GameResult::BlackWins);
        assert_eq!(record.moves.len(), 6);
        assert_eq!(record.meta.id.as_deref(), Some("q7ZvsdUF"));
        assert_eq!(record.meta.speed.as_deref(), Some("blitz"));

        let obs = extract_observations(&record);
        assert_eq!(obs.len(), 6);
        assert_eq!(obs[1].player_rating, Some(1420));
        assert_eq!(obs[1].average_rating, Some(1460));
    }

    #[test]
    fn test_missing_rating_and_winner_are_unknown() {
        let game = parse_export(EXPORT).remove(1);
        let record = game.into_record().unwrap();

        assert_eq!(record.white_rating, Some(1300));
        assert_eq!(record.black_rating, None);
        assert_eq!(record.result, GameResult::Unknown);
    }

    #[test]
    fn test_missing_players_rejected() {
        let game = parse_export(EXPORT).remove(2);
        assert!(matches!(game.into_record(), Err(GameError::MissingPlayers)));
    }

    #[test]
    fn test_custom_start_rejected() {
        let mut game = parse_export(EXPORT).remove(0);
        game.initial_fen = Some("8/8/8/4k3/8/8/4K3/8 w - - 0 1".into());
        assert!(matches!(game.into_record(), Err(GameError::NonStandardStart)));
    }
}
