//! Index statistics for the configured sites

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;
use crate::error::Result;
use crate::models::SiteStatus;
use crate::storage::Storage;

/// Error shown for a configured site that has no stored record
pub const NOT_INDEXED_MESSAGE: &str = "Сайт ещё не проиндексирован";

/// Totals over all configured sites
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalStatistics {
    pub sites: usize,
    pub pages: usize,
    pub lemmas: usize,
    pub indexing: bool,
}

/// Per-site statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedStatistics {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    /// Unix time in milliseconds
    pub status_time: i64,
    pub error: String,
    pub pages: usize,
    pub lemmas: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsResponse {
    pub total: TotalStatistics,
    pub detailed: Vec<DetailedStatistics>,
}

/// Collect statistics in configuration order
pub fn statistics(
    sites: &[SiteConfig],
    storage: &dyn Storage,
    indexing: bool,
) -> Result<StatisticsResponse> {
    let mut response = StatisticsResponse {
        total: TotalStatistics {
            sites: sites.len(),
            indexing,
            ..Default::default()
        },
        detailed: Vec::with_capacity(sites.len()),
    };

    for config in sites {
        let detail = match storage.find_site_by_url(&config.url)? {
            Some(site) => DetailedStatistics {
                url: config.url.clone(),
                name: config.name.clone(),
                status: site.status,
                status_time: site.status_time.timestamp_millis(),
                error: site.last_error,
                pages: storage.count_pages_by_site(site.id)?,
                lemmas: storage.count_lemmas_by_site(site.id)?,
            },
            None => DetailedStatistics {
                url: config.url.clone(),
                name: config.name.clone(),
                status: SiteStatus::Failed,
                status_time: Utc::now().timestamp_millis(),
                error: NOT_INDEXED_MESSAGE.to_string(),
                pages: 0,
                lemmas: 0,
            },
        };

        response.total.pages += detail.pages;
        response.total.lemmas += detail.lemmas;
        response.detailed.push(detail);
    }

    Ok(response)
}
