use axum::{extract::Query, Extension, Json};
use move_store::{stats_by_bracket, BracketMoveStat, BracketQuery, RatingColumn};
use serde::Deserialize;

use super::{parse_position, with_store};
use crate::config::Config;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct BracketStatsParams {
    pub width: Option<u32>,
    pub min_samples: Option<u32>,
    pub rating_column: Option<RatingColumn>,
    pub fen: Option<String>,
}

/// GET /api/bracket-stats?width=200&min_samples=1&fen=...
pub async fn get_bracket_stats(
    Extension(config): Extension<Config>,
    Query(params): Query<BracketStatsParams>,
) -> Result<Json<Vec<BracketMoveStat>>, AppError> {
    let defaults = BracketQuery::default();
    let query = BracketQuery {
        width: params.width.unwrap_or(defaults.width),
        min_samples_move: params.min_samples.unwrap_or(defaults.min_samples_move),
        rating_column: params.rating_column.unwrap_or_default(),
        position: parse_position(params.fen)?,
    };
    query.validate()?;

    let stats = with_store(&config, move |store| stats_by_bracket(store, &query)).await?;
    Ok(Json(stats))
}
