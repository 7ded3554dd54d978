//! Unified error handling for the sitesearch crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while keeping the domain-specific errors
//! available where a narrower type reads better.
//!
//! # Architecture
//!
//! - [`SiteSearchErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification used for API status codes and metrics
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use sitesearch::error::{Error, SiteSearchErrorTrait};
//!
//! fn respond(err: &Error) -> String {
//!     err.user_message()
//! }
//! ```

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::utils::error::{FetchError, IndexingError, SearchError};

/// Message stored on sites whose run was stopped by request
pub const CANCELLED_MESSAGE: &str = "Индексация прервана пользователем";

/// Common trait for all sitesearch error types
pub trait SiteSearchErrorTrait: std::error::Error {
    /// Message shown to API and CLI users
    fn user_message(&self) -> String;

    /// Category deciding the API status code and the metrics label
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, DNS)
    Network,
    /// Run-state and scope errors of the indexer
    Indexing,
    /// Query errors
    Search,
    /// Storage and I/O errors
    Storage,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Indexing => "indexing",
            Self::Search => "search",
            Self::Storage => "storage",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the sitesearch crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Indexer control errors
    #[error("Indexing error: {0}")]
    Indexing(#[from] IndexingError),

    /// Query errors
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SiteSearchErrorTrait for FetchError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }
}

impl SiteSearchErrorTrait for IndexingError {
    fn user_message(&self) -> String {
        match self {
            Self::AlreadyRunning => "Индексация уже запущена".to_string(),
            Self::NotRunning => "Индексация не запущена".to_string(),
            Self::OutOfScope(_) => "Данная страница находится за пределами сайтов, \
                                    указанных в конфигурационном файле"
                .to_string(),
            Self::Storage(e) => e.user_message(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Storage(_) => ErrorCategory::Storage,
            _ => ErrorCategory::Indexing,
        }
    }
}

impl SiteSearchErrorTrait for SearchError {
    fn user_message(&self) -> String {
        match self {
            Self::EmptyQuery => "Задан пустой поисковый запрос".to_string(),
            Self::NoResults => "По вашему запросу нет результатов".to_string(),
            Self::Storage(e) => e.user_message(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Storage(_) => ErrorCategory::Storage,
            _ => ErrorCategory::Search,
        }
    }
}

impl SiteSearchErrorTrait for Error {
    fn user_message(&self) -> String {
        match self {
            Self::Fetch(e) => e.user_message(),
            Self::Indexing(e) => e.user_message(),
            Self::Search(e) => e.user_message(),
            Self::Database(e) => format!("Ошибка базы данных: {e}"),
            Self::Io(e) => format!("Ошибка ввода-вывода: {e}"),
            Self::Http(e) => format!("Ошибка HTTP: {e}"),
            Self::Other { context, .. } => context.clone(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(_) | Self::Http(_) => ErrorCategory::Network,
            Self::Indexing(e) => e.category(),
            Self::Search(e) => e.category(),
            Self::Database(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from rusqlite::Error
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err)
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
