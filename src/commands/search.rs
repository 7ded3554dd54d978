use anyhow::Result;

use sitesearch::config::Config;
use sitesearch::error::SiteSearchErrorTrait;
use sitesearch::search::{SearchEngine, SearchOptions, SearchQuery};
use sitesearch::utils::error::SearchError;

use super::{load_analyzer, open_storage};

pub fn search(
    config: Config,
    query: String,
    site: Option<String>,
    offset: usize,
    limit: usize,
) -> Result<()> {
    println!("Searching for: \"{query}\"");
    println!("================================");

    let storage = open_storage(&config, false)?;
    let analyzer = load_analyzer(&config)?;
    let engine = SearchEngine::new(
        config.sites.clone(),
        storage,
        analyzer,
        SearchOptions::from(&config.search),
    );

    let mut request = SearchQuery::new(&query).with_page(offset, limit);
    if let Some(site) = site {
        request = request.with_site(&site);
    }

    let response = match engine.search(&request) {
        Ok(response) => response,
        Err(e @ (SearchError::EmptyQuery | SearchError::NoResults)) => {
            println!("\n{}", e.user_message());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "\nFound {} results, showing {}:\n",
        response.count,
        response.data.len()
    );

    for (i, result) in response.data.iter().enumerate() {
        println!(
            "{}. {} (relevance: {:.3})",
            offset + i + 1,
            result.title,
            result.relevance
        );
        println!("   Site: {} | {}{}", result.site_name, result.site, result.uri);
        if !result.snippet.is_empty() {
            println!(
                "   > {}",
                result.snippet.replace("<b>", "[").replace("</b>", "]")
            );
        }
        println!();
    }

    Ok(())
}
