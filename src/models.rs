// Core data structures for the sitesearch index

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage identifier; `0` marks a record that has not been saved yet
pub type EntityId = i64;

/// Indexing status of a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SiteStatus {
    Indexing,
    Indexed,
    Failed,
}

impl SiteStatus {
    /// Get string representation (as stored and served)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for SiteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INDEXING" => Ok(Self::Indexing),
            "INDEXED" => Ok(Self::Indexed),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown site status: {other}")),
        }
    }
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured site and the state of its last indexing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: EntityId,
    pub name: String,
    pub url: String,
    pub status: SiteStatus,
    pub status_time: DateTime<Utc>,
    /// Empty when the last run recorded no error
    pub last_error: String,
}

impl Site {
    /// Create an unsaved site record in INDEXING state
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            url: url.to_string(),
            status: SiteStatus::Indexing,
            status_time: Utc::now(),
            last_error: String::new(),
        }
    }

    /// Change status and bump the status timestamp
    pub fn set_status(&mut self, status: SiteStatus) {
        self.status = status;
        self.status_time = Utc::now();
    }

    /// Mark the site failed with a message
    pub fn fail(&mut self, message: impl Into<String>) {
        self.last_error = message.into();
        self.set_status(SiteStatus::Failed);
    }
}

/// A fetched page of a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: EntityId,
    pub site_id: EntityId,
    /// URL path with scheme, host and query stripped
    pub path: String,
    /// HTTP status; 0 when the request never produced one
    pub code: u16,
    /// Raw HTML; empty unless the page was fetched with status 200
    pub content: String,
}

impl Page {
    pub fn new(site_id: EntityId, path: &str) -> Self {
        Self {
            id: 0,
            site_id,
            path: path.to_string(),
            code: 0,
            content: String::new(),
        }
    }
}

/// A normalized word form of a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lemma {
    pub id: EntityId,
    pub site_id: EntityId,
    pub lemma: String,
    /// Number of the site's pages containing this lemma
    pub frequency: u32,
}

impl Lemma {
    pub fn new(site_id: EntityId, lemma: &str) -> Self {
        Self {
            id: 0,
            site_id,
            lemma: lemma.to_string(),
            frequency: 0,
        }
    }
}

/// Index record linking a page and a lemma
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: EntityId,
    pub page_id: EntityId,
    pub lemma_id: EntityId,
    /// In-page occurrence count of the lemma
    pub rank: f32,
}

impl Occurrence {
    pub fn new(page_id: EntityId, lemma_id: EntityId, rank: f32) -> Self {
        Self {
            id: 0,
            page_id,
            lemma_id,
            rank,
        }
    }
}
