//! Error types for the sitesearch crawler and search engine
//!
//! This module defines the domain error enums used throughout the application.

use thiserror::Error;

/// Classified failures of a single page fetch
///
/// None of these abort a crawl run: they end the affected crawl task and are
/// surfaced through the page status code and, for a site's root page, the
/// site's last error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Response is not an HTML document
    #[error("Not a page (status {status}, content type {content_type})")]
    NotAPage { status: u16, content_type: String },

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// URL could not be parsed or requested
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Server answered with an error status
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// DNS or connection failure
    #[error("Host unreachable: {0}")]
    HostUnreachable(String),

    /// Transport or body decoding failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Fetch abandoned because the run was cancelled
    #[error("Interrupted")]
    Interrupted,
}

impl FetchError {
    /// HTTP status obtained before the failure, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::NotAPage { status, .. } => Some(*status),
            Self::HttpStatus(status) => Some(*status),
            _ => None,
        }
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotAPage { .. } => "not_a_page",
            Self::Timeout => "timeout",
            Self::InvalidUrl(_) => "invalid_url",
            Self::HttpStatus(_) => "http_error",
            Self::HostUnreachable(_) => "host_unreachable",
            Self::Io(_) => "io_error",
            Self::Interrupted => "interrupted",
        }
    }

    /// Message recorded on the site when its root page fails
    pub fn site_message(&self, url: &str) -> String {
        match self {
            Self::NotAPage { .. } => format!("{url} - не является страницей"),
            Self::Timeout => format!("{url} - время ожидания истекло"),
            Self::InvalidUrl(_) => format!("{url} - неверная ссылка"),
            Self::HttpStatus(status) => format!("{url} - ошибка HTTP {status}"),
            Self::HostUnreachable(_) => format!("{url} - не удается получить доступ к сайту"),
            Self::Io(reason) => format!("{url} - {reason}"),
            Self::Interrupted => format!("{url} - прерывание пользователя"),
        }
    }
}

/// Errors returned by the indexing orchestrator's control operations
#[derive(Error, Debug)]
pub enum IndexingError {
    /// A run is already active
    #[error("Indexing is already running")]
    AlreadyRunning,

    /// No run is active
    #[error("Indexing is not running")]
    NotRunning,

    /// URL is not one of the configured site roots
    #[error("URL is outside the configured sites: {0}")]
    OutOfScope(String),

    /// Storage failure while serving the request
    #[error("Storage error: {0}")]
    Storage(#[source] Box<crate::error::Error>),
}

/// Errors returned by the search engine
#[derive(Error, Debug)]
pub enum SearchError {
    /// Query string is blank
    #[error("Empty search query")]
    EmptyQuery,

    /// Query has no meaningful lemmas or no page matches all of them
    #[error("No results")]
    NoResults,

    /// Storage failure while reading the index
    #[error("Storage error: {0}")]
    Storage(#[source] Box<crate::error::Error>),
}

impl From<crate::error::Error> for IndexingError {
    fn from(err: crate::error::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}

impl From<crate::error::Error> for SearchError {
    fn from(err: crate::error::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}
