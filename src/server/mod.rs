//! HTTP server
//!
//! Wires the indexing orchestrator, the search engine and the storage into an
//! axum application.

pub mod api;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{ServerConfig, SiteConfig};
use crate::crawler::IndexingOrchestrator;
use crate::search::SearchEngine;
use crate::storage::SharedStorage;

pub use api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Indexing run control
    pub orchestrator: IndexingOrchestrator,

    /// Query engine
    pub search: Arc<SearchEngine>,

    /// Index storage, read by the statistics endpoint
    pub storage: SharedStorage,

    /// Configured sites
    pub sites: Arc<[SiteConfig]>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        orchestrator: IndexingOrchestrator,
        search: SearchEngine,
        storage: SharedStorage,
    ) -> Self {
        let sites = Arc::from(orchestrator.sites());
        Self {
            orchestrator,
            search: Arc::new(search),
            storage,
            sites,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Search Server
// ============================================================================

/// HTTP front end of the search service
pub struct SearchServer {
    config: ServerConfig,
    state: AppState,
}

impl SearchServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Serve until the shutdown signal resolves
    ///
    /// An indexing run still active at shutdown is stopped so that its sites
    /// are left marked as interrupted.
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        tracing::info!("Starting search server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        if self.state.orchestrator.is_indexing() {
            tracing::info!("Stopping active indexing run");
            if let Err(e) = self.state.orchestrator.stop_all().await {
                tracing::warn!(error = %e, "Failed to stop indexing on shutdown");
            }
        }

        tracing::info!("Search server shutdown complete");
        Ok(())
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone)]
pub enum ServerError {
    /// Failed to bind to address
    BindError(String),

    /// Server error
    ServeError(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BindError(msg) => write!(f, "Failed to bind: {}", msg),
            Self::ServeError(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}
