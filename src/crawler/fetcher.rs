//! HTTP fetcher implementation
//!
//! This module handles all outbound HTTP for the pipeline:
//! - Building the HTTP client with the configured user agent
//! - A process-wide cap on simultaneous connections
//! - Global request rate limiting
//! - Classifying failures into timeout, connection and HTTP status errors
//!
//! The fetcher makes exactly one attempt per call. Retrying is the
//! caller's decision (see `RetryPolicy`).

use crate::config::FetcherConfig;
use crate::FetchError;
use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{redirect::Policy, Client};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Ceiling applied to every request regardless of what the caller asks for
pub const MAX_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// URL that was requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    pub status: u16,
    /// Content-Type header value, empty when absent
    pub content_type: String,
    pub body: String,
}

impl PageContent {
    pub fn is_html(&self) -> bool {
        self.content_type.is_empty() || self.content_type.contains("html")
    }
}

/// Capability to GET a page with an upper time bound
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`, giving up after `timeout`
    ///
    /// Non-2xx responses are `FetchError::HttpStatus`; network failures are
    /// `Timeout` or `Connection`.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<PageContent, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use customer_scout::config::FetcherConfig;
/// use customer_scout::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let request_timeout = Duration::from_millis(config.request_timeout_ms).min(MAX_FETCH_TIMEOUT);

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(MAX_FETCH_TIMEOUT)
        .connect_timeout(request_timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(5))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`Fetcher`] shared by every job in the process
pub struct HttpFetcher {
    client: Client,
    connections: Arc<Semaphore>,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            connections: Arc::new(Semaphore::new(config.max_connections.max(1) as usize)),
            rate_limiter: RateLimiter::direct(Quota::per_second(rate)),
        })
    }

    /// Connection slots not currently in use
    pub fn available_connections(&self) -> usize {
        self.connections.available_permits()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<PageContent, FetchError> {
        let timeout = timeout.min(MAX_FETCH_TIMEOUT);

        self.rate_limiter.until_ready().await;

        // Held for the whole exchange, body included
        let _permit = self
            .connections
            .acquire()
            .await
            .map_err(|_| FetchError::Connection {
                url: url.to_string(),
                message: "connection pool closed".to_string(),
            })?;

        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .text()
            .await
            .map_err(|e| classify_error(url, e))?;

        Ok(PageContent {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

/// Maps a reqwest failure onto the fetch error taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if let Some(status) = error.status() {
        FetchError::HttpStatus {
            url: url.to_string(),
            code: status.as_u16(),
        }
    } else {
        FetchError::Connection {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&FetcherConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_fetcher_starts_with_all_connections() {
        let config = FetcherConfig {
            max_connections: 3,
            ..FetcherConfig::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        assert_eq!(fetcher.available_connections(), 3);
    }

    #[test]
    fn test_is_html() {
        let mut page = PageContent {
            url: "https://acme.io".to_string(),
            final_url: "https://acme.io/".to_string(),
            status: 200,
            content_type: "text/html; charset=utf-8".to_string(),
            body: String::new(),
        };
        assert!(page.is_html());

        page.content_type = "application/pdf".to_string();
        assert!(!page.is_html());

        page.content_type.clear();
        assert!(page.is_html());
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        let fetcher = HttpFetcher::new(&FetcherConfig::default()).unwrap();
        // Port 9 (discard) is closed on test machines
        let result = fetcher
            .fetch("http://127.0.0.1:9/", Duration::from_secs(2))
            .await;
        assert!(matches!(
            result,
            Err(FetchError::Connection { .. }) | Err(FetchError::Timeout { .. })
        ));
    }
}
