//! Read-only HTTP API over the move statistics store.

pub mod config;
pub mod error;
pub mod routes;

use axum::{routing::get, Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;

pub fn app(config: Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/top-moves", get(routes::top_moves::get_top_moves))
        .route("/api/bracket-stats", get(routes::bracket_stats::get_bracket_stats))
        .layer(Extension(config))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
