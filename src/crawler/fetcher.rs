//! HTTP page fetcher with request pacing and charset detection
//!
//! This module provides the page fetcher used by crawl tasks, with features
//! including:
//! - A fixed pause before every request
//! - Optional global rate limiting with governor
//! - Content-type checks (only HTML counts as a page)
//! - Charset detection and conversion with encoding_rs

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use regex::bytes::Regex;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER},
    Client,
};
use std::num::NonZeroU32;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use crate::config::CrawlerConfig;
use crate::utils::error::FetchError;

/// Content types accepted as pages
const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// How far into the body a `<meta charset>` hint is searched
const META_SNIFF_LEN: usize = 1024;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?([a-z0-9_\-]+)"#).expect("static regex")
});

/// Result of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,

    /// Decoded HTML, present only for status 200
    pub body: Option<String>,
}

/// Retrieves pages for crawl tasks
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one URL
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed [`PageFetcher`]
pub struct HttpPageFetcher {
    /// HTTP client with configured timeout, compression and headers
    client: Client,

    /// Optional limiter shared by all requests of this fetcher
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,

    /// Pause before every request
    request_delay: Duration,
}

impl HttpPageFetcher {
    /// Create a fetcher from crawler settings
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be created
    pub fn new(config: &CrawlerConfig) -> crate::error::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        if let Ok(referrer) = HeaderValue::from_str(&config.referrer) {
            headers.insert(REFERER, referrer);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let rate_limiter = NonZeroU32::new(config.requests_per_second)
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));

        Ok(Self {
            client,
            rate_limiter,
            request_delay: Duration::from_millis(config.request_delay_ms),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(FetchError::HttpStatus(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_default();

        if !is_html(&content_type) {
            return Err(FetchError::NotAPage {
                status,
                content_type,
            });
        }

        if status != 200 {
            return Ok(FetchedPage { status, body: None });
        }

        let bytes = response.bytes().await.map_err(classify_error)?;
        Ok(FetchedPage {
            status,
            body: Some(decode_body(&bytes, &content_type)),
        })
    }
}

/// Map a reqwest failure to a fetch error kind
fn classify_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_builder() {
        FetchError::InvalidUrl(err.to_string())
    } else if err.is_connect() {
        FetchError::HostUnreachable(err.to_string())
    } else {
        FetchError::Io(err.to_string())
    }
}

/// Check a Content-Type header value; a missing header counts as HTML
pub fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || HTML_CONTENT_TYPES.contains(&mime.as_str())
}

/// Decode a body to text
///
/// This method tries multiple strategies:
/// 1. Charset in the Content-Type header
/// 2. `<meta charset>` hint near the top of the document
/// 3. UTF-8 if the bytes are valid UTF-8
/// 4. windows-1251 as the last resort
pub fn decode_body(bytes: &[u8], content_type: &str) -> String {
    let declared = charset_param(content_type)
        .or_else(|| sniff_meta_charset(bytes))
        .and_then(|label| Encoding::for_label(label.as_bytes()));

    if let Some(encoding) = declared {
        let (text, _, _) = encoding.decode(bytes);
        return text.into_owned();
    }

    let (text, _, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }

    let (text, _, _) = WINDOWS_1251.decode(bytes);
    text.into_owned()
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(META_SNIFF_LEN)];
    META_CHARSET
        .captures(head)
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}
