use anyhow::{Context, Result};

use sitesearch::config::Config;
use sitesearch::crawler::orchestrator_from_config;
use sitesearch::search::{SearchEngine, SearchOptions};
use sitesearch::server::{AppState, SearchServer};

use super::{load_analyzer, open_storage};

/// Start the HTTP server
pub async fn serve(config: Config, memory: bool) -> Result<()> {
    let storage = open_storage(&config, memory)?;
    let analyzer = load_analyzer(&config)?;

    let orchestrator = orchestrator_from_config(&config, storage.clone(), analyzer.clone())
        .context("Failed to create indexing orchestrator")?;
    let engine = SearchEngine::new(
        config.sites.clone(),
        storage.clone(),
        analyzer,
        SearchOptions::from(&config.search),
    );

    let state = AppState::new(orchestrator, engine, storage);
    let server = SearchServer::new(config.server.clone(), state);
    let bind_address = config.server.bind_address;

    println!("Starting Site Search Server");
    println!("===========================");
    println!("  Sites: {}", config.sites.len());
    for site in &config.sites {
        println!("    - {} ({})", site.name, site.url);
    }
    println!(
        "  CORS: {}",
        if config.server.enable_cors { "enabled" } else { "disabled" }
    );
    println!();
    println!("API Endpoints:");
    println!("  GET  /api/health          - Health check");
    println!("  GET  /api/metrics         - Prometheus metrics");
    println!("  GET  /api/statistics      - Index statistics");
    println!("  GET  /api/startIndexing   - Index all sites");
    println!("  GET  /api/stopIndexing    - Stop indexing");
    println!("  POST /api/indexPage?url=  - Re-index one site");
    println!("  GET  /api/search?query=   - Search");
    println!();
    println!("Search server listening on http://{bind_address}");
    println!("Press Ctrl+C to stop.\n");

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    println!("Search server stopped.");
    Ok(())
}
