use axum::{extract::Query, Extension, Json};
use move_store::{top_moves, RankedMoveStat, RatingColumn, TopMovesQuery};
use serde::Deserialize;

use super::{parse_position, with_store};
use crate::config::Config;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct TopMovesParams {
    pub min_rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub k: Option<u32>,
    pub min_samples: Option<u32>,
    pub rating_column: Option<RatingColumn>,
    pub fen: Option<String>,
}

impl TopMovesParams {
    fn into_query(self) -> Result<TopMovesQuery, AppError> {
        let defaults = TopMovesQuery::default();
        let query = TopMovesQuery {
            min_rating: self.min_rating.unwrap_or(defaults.min_rating),
            max_rating: self.max_rating.unwrap_or(defaults.max_rating),
            k: self.k.unwrap_or(defaults.k),
            min_samples_move: self.min_samples.unwrap_or(defaults.min_samples_move),
            rating_column: self.rating_column.unwrap_or_default(),
            position: parse_position(self.fen)?,
        };
        query.validate()?;
        Ok(query)
    }
}

/// GET /api/top-moves?min_rating=800&max_rating=1200&k=15&min_samples=5&fen=...
/// Ranked moves per position. Without `fen`, every position in range.
pub async fn get_top_moves(
    Extension(config): Extension<Config>,
    Query(params): Query<TopMovesParams>,
) -> Result<Json<Vec<RankedMoveStat>>, AppError> {
    let query = params.into_query()?;
    let stats = with_store(&config, move |store| top_moves(store, &query)).await?;
    Ok(Json(stats))
}
