//! Prometheus metrics for the indexer and the search engine
//!
//! This module provides metrics tracking for:
//! - Crawling: pages fetched per site, fetch errors by kind, run outcomes
//! - Search: requests by outcome and their duration
//! - API: rejected requests by error category
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all metrics
struct SiteSearchMetrics {
    pages_fetched: CounterVec,
    fetch_errors: CounterVec,
    site_runs: CounterVec,
    site_run_duration: HistogramVec,
    search_requests: CounterVec,
    search_duration: HistogramVec,
    api_errors: CounterVec,
    indexing_active: Gauge,
}

/// Global storage for metrics
static METRICS: OnceLock<SiteSearchMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, subsequent metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = sitesearch::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = SiteSearchMetrics {
        pages_fetched: register_counter_vec!(
            "sitesearch_pages_fetched_total",
            "Total pages fetched by site",
            &["site"]
        )?,
        fetch_errors: register_counter_vec!(
            "sitesearch_fetch_errors_total",
            "Total page fetch failures by kind",
            &["kind"]
        )?,
        site_runs: register_counter_vec!(
            "sitesearch_site_runs_total",
            "Total finished site indexing runs by outcome",
            &["outcome"]
        )?,
        site_run_duration: register_histogram_vec!(
            "sitesearch_site_run_duration_seconds",
            "Time spent indexing a site in seconds",
            &["site"],
            vec![1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0]
        )?,
        search_requests: register_counter_vec!(
            "sitesearch_search_requests_total",
            "Total search requests by outcome",
            &["outcome"]
        )?,
        search_duration: register_histogram_vec!(
            "sitesearch_search_duration_seconds",
            "Search request duration in seconds",
            &["outcome"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
        )?,
        api_errors: register_counter_vec!(
            "sitesearch_api_errors_total",
            "Total API requests answered with an error, by error category",
            &["category"]
        )?,
        indexing_active: register_gauge!(
            "sitesearch_indexing_active",
            "Whether an indexing run is active (1 = yes, 0 = no)"
        )?,
    };

    METRICS
        .set(metrics)
        .map_err(|_| "Metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a page fetched with a response
pub fn record_page_fetched(site: &str) {
    if let Some(m) = METRICS.get() {
        m.pages_fetched.with_label_values(&[site]).inc();
    }
}

/// Record a failed page fetch
pub fn record_fetch_error(kind: &str) {
    if let Some(m) = METRICS.get() {
        m.fetch_errors.with_label_values(&[kind]).inc();
    }
}

/// Record the end of one site's run (`indexed`, `failed` or `cancelled`)
pub fn record_site_run(outcome: &str) {
    if let Some(m) = METRICS.get() {
        m.site_runs.with_label_values(&[outcome]).inc();
    }
}

/// Record a search request
pub fn record_search(outcome: &str, duration_secs: f64) {
    let Some(m) = METRICS.get() else {
        return;
    };

    m.search_requests.with_label_values(&[outcome]).inc();
    m.search_duration
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

/// Record an API request answered with an error
pub fn record_api_error(category: &str) {
    if let Some(m) = METRICS.get() {
        m.api_errors.with_label_values(&[category]).inc();
    }
}

/// Update the run-state gauge
pub fn set_indexing_active(active: bool) {
    if let Some(m) = METRICS.get() {
        m.indexing_active.set(if active { 1.0 } else { 0.0 });
    }
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start a site run timer
pub fn start_site_run_timer(site: &str) -> MetricsTimer {
    match METRICS.get() {
        Some(m) => MetricsTimer::new(m.site_run_duration.with_label_values(&[site]).start_timer()),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================
