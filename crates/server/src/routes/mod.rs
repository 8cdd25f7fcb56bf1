pub mod bracket_stats;
pub mod health;
pub mod top_moves;

use chess_core::position::canonical_key;
use move_store::MoveStore;

use crate::config::Config;
use crate::error::AppError;

/// Run a query against a fresh read-only handle on the blocking pool.
/// Each request gets its own connection, so queries never wait on each other
/// or on an ingest writing to the same file.
async fn with_store<T, F>(config: &Config, query: F) -> Result<T, AppError>
where
    F: FnOnce(&MoveStore) -> move_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let path = config.db_path.clone();
    let result = tokio::task::spawn_blocking(move || {
        let store = MoveStore::open_read_only(&path)?;
        query(&store)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Query task failed: {e}")))?;

    Ok(result?)
}

/// Accept any FEN for a position filter, but only if it describes a legal position.
fn parse_position(fen: Option<String>) -> Result<Option<String>, AppError> {
    match fen.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        None => Ok(None),
        Some(fen) => {
            let key = canonical_key(fen)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid FEN: {fen}")))?;
            Ok(Some(key))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chess_core::position::STARTING_POSITION_KEY;
    use chess_core::Side;
    use move_store::{IngestSource, MoveRow, MoveStore};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Config;

    fn row(mv: &str, rating: i32, mover_score: u8) -> MoveRow {
        MoveRow {
            ply: 1,
            fen_before: STARTING_POSITION_KEY.to_string(),
            move_san: mv.to_string(),
            mover: Side::White,
            average_rating: Some(rating),
            player_rating: Some(rating),
            mover_score,
            source: IngestSource::Bulk,
            game_id: None,
            rated: None,
            variant: None,
            speed: None,
        }
    }

    fn seeded_config(dir: &tempfile::TempDir) -> Config {
        let db_path = dir.path().join("moves.sqlite");
        let mut store = MoveStore::open(&db_path).unwrap();
        store
            .insert_batch(&[
                row("e4", 1000, 2),
                row("e4", 1000, 1),
                row("d4", 1000, 0),
                row("d4", 1300, 2),
            ])
            .unwrap();
        store.close().unwrap();

        Config {
            db_path,
            host: "127.0.0.1".into(),
            port: 0,
        }
    }

    async fn get(config: Config, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = crate::app(config).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(seeded_config(&dir), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn top_moves_ranks_within_range() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(
            seeded_config(&dir),
            "/api/top-moves?min_rating=800&max_rating=1200&min_samples=1",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["move_notation"], "e4");
        assert_eq!(rows[0]["sample_count"], 2);
        assert_eq!(rows[0]["mean_outcome"], 0.75);
        assert_eq!(rows[0]["rank"], 1);
        assert_eq!(rows[1]["move_notation"], "d4");
        assert_eq!(rows[1]["rank"], 2);
    }

    #[tokio::test]
    async fn top_moves_filters_by_fen() {
        let dir = tempfile::tempdir().unwrap();
        let uri = "/api/top-moves?min_samples=1&min_rating=0&max_rating=3000\
                   &fen=rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR%20b%20KQkq%20-%200%201";
        let (status, body) = get(seeded_config(&dir), uri).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn inverted_range_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) =
            get(seeded_config(&dir), "/api/top-moves?min_rating=1500&max_rating=1000").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("min_rating"));
    }

    #[tokio::test]
    async fn invalid_fen_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(seeded_config(&dir), "/api/top-moves?fen=not-a-position").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid FEN"));
    }

    #[tokio::test]
    async fn bracket_stats_group_by_bracket() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(seeded_config(&dir), "/api/bracket-stats?width=200").await;

        assert_eq!(status, StatusCode::OK);
        let brackets: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| (r["rating_bracket"].as_str().unwrap(), r["move_notation"].as_str().unwrap()))
            .collect();
        assert_eq!(
            brackets,
            [("1000-1199", "e4"), ("1000-1199", "d4"), ("1200-1399", "d4")]
        );
    }

    #[tokio::test]
    async fn missing_store_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("absent.sqlite"),
            host: "127.0.0.1".into(),
            port: 0,
        };

        let (status, body) = get(config, "/api/top-moves").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Database error");
    }
}
