//! REST API handlers
//!
//! Every JSON body carries `result: bool`; failures add an `error` message.
//! Domain failures (a run already active, an empty query and so on) are
//! answered with HTTP 200, storage failures with HTTP 500.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCategory, SiteSearchErrorTrait};
use crate::metrics;
use crate::search::{SearchQuery, SearchResult};
use crate::statistics::{statistics, StatisticsResponse};

use super::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Outcome of a control request
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            result: true,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: false,
            error: Some(message.into()),
        }
    }
}

/// Search results page
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchApiResponse {
    pub result: bool,
    pub count: usize,
    pub data: Vec<SearchResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatisticsApiResponse {
    pub result: bool,
    pub statistics: StatisticsResponse,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub indexing: bool,
}

#[derive(Debug, Deserialize)]
pub struct IndexPageParams {
    pub url: String,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/metrics", get(metrics_text))
        .route("/api/statistics", get(get_statistics))
        .route("/api/startIndexing", get(start_indexing))
        .route("/api/stopIndexing", get(stop_indexing))
        .route("/api/indexPage", post(index_page))
        .route("/api/search", get(search))
        .with_state(state)
}

/// HTTP status for an error category
///
/// Indexing and search rejections are answers, not failures.
fn error_status(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::Indexing | ErrorCategory::Search => StatusCode::OK,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response<E: SiteSearchErrorTrait>(err: &E) -> Response {
    let category = err.category();
    metrics::record_api_error(category.as_str());

    let status = error_status(category);
    if status.is_server_error() {
        tracing::error!(error = %err, category = category.as_str(), "Request failed");
    } else {
        tracing::debug!(error = %err, category = category.as_str(), "Request rejected");
    }
    (status, Json(ApiResponse::error(err.user_message()))).into_response()
}

// ============================================================================
// Service Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        indexing: state.orchestrator.is_indexing(),
    })
}

async fn metrics_text() -> Response {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to encode metrics: {e}"))),
        )
            .into_response(),
    }
}

// ============================================================================
// Indexing Handlers
// ============================================================================

async fn get_statistics(State(state): State<AppState>) -> Response {
    let indexing = state.orchestrator.is_indexing();
    match statistics(&state.sites, state.storage.as_ref(), indexing) {
        Ok(statistics) => Json(StatisticsApiResponse {
            result: true,
            statistics,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn start_indexing(State(state): State<AppState>) -> Response {
    match state.orchestrator.start_all() {
        Ok(()) => Json(ApiResponse::ok()).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn stop_indexing(State(state): State<AppState>) -> Response {
    match state.orchestrator.stop_all().await {
        Ok(()) => Json(ApiResponse::ok()).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn index_page(
    State(state): State<AppState>,
    Query(params): Query<IndexPageParams>,
) -> Response {
    match state.orchestrator.index_one(params.url.trim()) {
        Ok(()) => Json(ApiResponse::ok()).into_response(),
        Err(e) => error_response(&e),
    }
}

// ============================================================================
// Search Handlers
// ============================================================================

async fn search(State(state): State<AppState>, Query(mut query): Query<SearchQuery>) -> Response {
    if query.site.as_deref().is_some_and(|site| site.trim().is_empty()) {
        query.site = None;
    }

    let engine = state.search.clone();
    let outcome = tokio::task::spawn_blocking(move || engine.search(&query)).await;

    match outcome {
        Ok(Ok(response)) => Json(SearchApiResponse {
            result: true,
            count: response.count,
            data: response.data,
        })
        .into_response(),
        Ok(Err(e)) => error_response(&e),
        Err(e) => {
            tracing::error!(error = %e, "Search task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Search failed")),
            )
                .into_response()
        }
    }
}
