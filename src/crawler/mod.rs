//! Crawler module for page fetching and processing
//!
//! This module contains the shared machinery every source builds on:
//! - HTTP fetching with connection and rate limits
//! - HTML parsing and customer-reference extraction
//! - Batching and retry scheduling
//! - The bounded worker pool that runs per-page tasks

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::{Coordinator, TaskError, TaskReport};
pub use fetcher::{build_http_client, Fetcher, HttpFetcher, PageContent, MAX_FETCH_TIMEOUT};
pub use parser::{
    extract_logo_names, extract_section_items, extract_section_links, parse_html, resolve_link,
    story_customer_name, title_customer_name, Link, ParsedPage, SectionItem,
};
pub use scheduler::{RetryPolicy, Scheduler};
