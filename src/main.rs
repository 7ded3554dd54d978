mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitesearch::config::Config;

#[derive(Parser)]
#[command(
    name = "sitesearch",
    version,
    about = "Site crawler with a lemma index and ranked full-text search",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configuration file
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Keep the index in memory instead of SQLite
    #[arg(long, global = true)]
    memory: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve,

    /// Index all configured sites and wait for completion
    Crawl {
        /// Re-index only the site rooted at this URL
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Search the index
    Search {
        /// Search query
        query: String,

        /// Restrict results to one site root URL
        #[arg(short, long)]
        site: Option<String>,

        /// Number of results to skip
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Number of results to show (0 for the configured default)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Show index statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_file(&cli.config)?;
    config.apply_env_overrides()?;
    config.validate()?;

    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    if let Err(e) = sitesearch::metrics::init_metrics() {
        tracing::warn!("Metrics initialization failed: {}", e);
    }

    tracing::info!(config = %cli.config.display(), "sitesearch starting");

    match cli.command {
        Commands::Serve => {
            tracing::info!("Starting serve command");
            commands::serve(config, cli.memory).await?;
        }

        Commands::Crawl { url } => {
            tracing::info!(url = ?url, "Starting crawl command");
            commands::crawl(config, url, cli.memory).await?;
        }

        Commands::Search {
            query,
            site,
            offset,
            limit,
        } => {
            tracing::info!(
                query = %query,
                site = ?site,
                offset = %offset,
                limit = %limit,
                "Starting search command"
            );
            commands::search(config, query, site, offset, limit)?;
        }

        Commands::Stats => {
            commands::stats(config)?;
        }
    }

    tracing::info!("sitesearch completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let directives = if verbose {
        "sitesearch=debug,info".to_string()
    } else {
        format!("sitesearch={level},warn")
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directives));

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}
