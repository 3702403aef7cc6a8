//! Customer Scout: vendor customer discovery
//!
//! This crate collects candidate customers of a software vendor from several
//! sources (the vendor's own site, customer directories, search engines,
//! enumerated customer pages, review sites and technology-usage indexes),
//! validates and deduplicates them, and hands the resulting corpus to a
//! summarization step.
//!
//! Jobs are submitted through [`jobs::JobService`] and polled for status.

pub mod aggregate;
pub mod config;
pub mod crawler;
pub mod jobs;
pub mod output;
pub mod sources;
pub mod state;
pub mod summarize;
pub mod url;
pub mod validate;

use thiserror::Error;

/// Main error type for Customer Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Source error: {0}")]
    Source(#[from] sources::SourceError),

    #[error("Validation error: {0}")]
    Validation(#[from] validate::ValidationError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] aggregate::AggregationError),

    #[error("Summarization error: {0}")]
    Summarization(#[from] summarize::SummarizationError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Job exceeded its time limit of {seconds}s")]
    JobTimeout { seconds: u64 },

    #[error("All sources failed")]
    Collection { reasons: Vec<String> },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScoutError {
    /// The `error_details.type` value reported to status pollers
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Summarization(_) => "summarization_error",
            Self::Aggregation(_) => "aggregation_error",
            Self::Collection { .. } => "collection_error",
            Self::JobTimeout { .. } => "timeout_error",
            _ => "internal_error",
        }
    }

    /// Itemized reasons for the failure, at least one entry
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Validation(e) => e.reasons.clone(),
            Self::Collection { reasons } if !reasons.is_empty() => reasons.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// Failures returned by a single fetch
///
/// The fetcher never retries; callers decide with [`FetchError::is_retryable`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("HTTP {code} for {url}")]
    HttpStatus { url: String, code: u16 },
}

impl FetchError {
    /// Short classification used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Connection { .. } => "connection",
            Self::HttpStatus { .. } => "http_status",
        }
    }

    /// Timeouts, connection failures, 429 and 5xx are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connection { .. } => true,
            Self::HttpStatus { code, .. } => *code == 429 || *code >= 500,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url } | Self::Connection { url, .. } | Self::HttpStatus { url, .. } => {
                url
            }
        }
    }
}

/// Malformed or unexpected HTML
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty document at {url}")]
    EmptyDocument { url: String },

    #[error("Unexpected structure at {url}: {message}")]
    UnexpectedStructure { url: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Customer Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use jobs::{JobId, JobReport, JobService};
pub use state::{CandidateRecord, JobStatus, ResultSet, ValidatedRecord};
pub use url::{dedup_key, normalize_url};
