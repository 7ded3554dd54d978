use anyhow::{Context, Result};

use sitesearch::config::Config;
use sitesearch::crawler::orchestrator_from_config;
use sitesearch::error::SiteSearchErrorTrait;
use sitesearch::statistics::{statistics, StatisticsResponse};

use super::{load_analyzer, open_storage};

/// Index every configured site, or re-index the one rooted at `url`
pub async fn crawl(config: Config, url: Option<String>, memory: bool) -> Result<()> {
    println!("Starting Site Indexing");
    println!("======================");

    let storage = open_storage(&config, memory)?;
    let analyzer = load_analyzer(&config)?;
    let orchestrator = orchestrator_from_config(&config, storage.clone(), analyzer)
        .context("Failed to create indexing orchestrator")?;

    let started = match &url {
        Some(url) => {
            println!("Indexing site: {url}");
            orchestrator.index_one(url)
        }
        None => {
            println!("Indexing {} sites", config.sites.len());
            orchestrator.start_all()
        }
    };
    if let Err(e) = started {
        anyhow::bail!(e.user_message());
    }

    tokio::select! {
        _ = orchestrator.wait_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted, stopping...");
            if let Err(e) = orchestrator.stop_all().await {
                tracing::warn!(error = %e, "Failed to stop indexing");
            }
        }
    }

    println!();
    let stats = statistics(&config.sites, storage.as_ref(), false)?;
    print_statistics(&stats);
    Ok(())
}

/// Print index statistics
pub fn stats(config: Config) -> Result<()> {
    let storage = open_storage(&config, false)?;
    let stats = statistics(&config.sites, storage.as_ref(), false)?;
    print_statistics(&stats);
    Ok(())
}

fn print_statistics(stats: &StatisticsResponse) {
    println!("Index Statistics");
    println!("================");
    println!("Sites:  {}", stats.total.sites);
    println!("Pages:  {}", stats.total.pages);
    println!("Lemmas: {}", stats.total.lemmas);

    for site in &stats.detailed {
        println!();
        println!("{} ({})", site.name, site.url);
        println!("  Status: {}", site.status);
        if let Some(time) = chrono::DateTime::from_timestamp_millis(site.status_time) {
            println!("  Updated: {}", time.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!("  Pages: {} | Lemmas: {}", site.pages, site.lemmas);
        if !site.error.is_empty() {
            println!("  Error: {}", site.error);
        }
    }
}
