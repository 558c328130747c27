use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::corpus::{tag_counts, TagCount};
use crate::ingest::types::NewsItem;
use crate::pipeline::{filter_by_tags, parse_tag_filter, NewsPipeline};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<NewsPipeline>,
}

/// API routes plus the bundled frontend (`/` and `/static/*`) served from `static_dir`.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/news", get(get_news))
        .route("/api/tags", get(get_tags))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    /// Comma-separated tag filter.
    pub tags: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub count: usize,
    pub news: Vec<NewsItem>,
    pub new_count: usize,
}

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<TagCount>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Runs one fetch/tag/merge cycle, then answers with the (optionally filtered) corpus.
async fn get_news(
    State(state): State<AppState>,
    Query(q): Query<NewsQuery>,
) -> impl IntoResponse {
    match state.pipeline.run_cycle().await {
        Ok(report) => {
            let filter = parse_tag_filter(q.tags.as_deref());
            let news = filter_by_tags(report.corpus, filter.as_ref());
            (
                StatusCode::OK,
                Json(NewsResponse {
                    count: news.len(),
                    news,
                    new_count: report.new_count,
                }),
            )
                .into_response()
        }
        Err(e) => server_error(e),
    }
}

async fn get_tags(State(state): State<AppState>) -> impl IntoResponse {
    match state.pipeline.store().load().await {
        Ok(items) => (
            StatusCode::OK,
            Json(TagsResponse {
                tags: tag_counts(&items),
            }),
        )
            .into_response(),
        Err(e) => server_error(e),
    }
}

fn server_error(e: anyhow::Error) -> axum::response::Response {
    tracing::error!(error = ?e, "corpus store failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("{e:#}"),
        }),
    )
        .into_response()
}
