//! Word enrichment API handlers
//!
//! POST /api/words/enrich, DELETE /api/words/cache

use axum::{
    extract::State,
    routing::{delete, post},
    Json, Router,
};
use serde::Serialize;

use crate::{
    error::{ApiError, ApiResult},
    models::{EnrichRequest, EnrichResponse, MAX_WORDS_PER_CALL},
    AppState,
};

/// DELETE /api/words/cache response
#[derive(Debug, Serialize)]
pub struct InvalidateCacheResponse {
    pub removed: usize,
}

/// POST /api/words/enrich
///
/// Always 200 for a valid word list; per-word failures are reported in
/// `failedWords`.
pub async fn enrich_words(
    State(state): State<AppState>,
    Json(request): Json<EnrichRequest>,
) -> ApiResult<Json<EnrichResponse>> {
    if request.words.is_empty() {
        return Err(ApiError::BadRequest("words must not be empty".to_string()));
    }
    if request.words.len() > MAX_WORDS_PER_CALL {
        return Err(ApiError::BadRequest(format!(
            "at most {} words per call, got {}",
            MAX_WORDS_PER_CALL,
            request.words.len()
        )));
    }

    let options = request.options();
    let report = state.coordinator.enrich(&request.words, &options).await?;

    Ok(Json(report.into_response(options.include_details)))
}

/// DELETE /api/words/cache
pub async fn invalidate_cache(State(state): State<AppState>) -> Json<InvalidateCacheResponse> {
    let removed = state.coordinator.invalidate_cache().await;
    Json(InvalidateCacheResponse { removed })
}

/// Build word enrichment routes
pub fn enrich_routes() -> Router<AppState> {
    Router::new()
        .route("/api/words/enrich", post(enrich_words))
        .route("/api/words/cache", delete(invalidate_cache))
}
