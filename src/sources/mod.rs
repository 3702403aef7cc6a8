//! Customer sources
//!
//! Every source implements [`CustomerSource`]: given a vendor name it
//! produces a capped, deduplicated list of candidate customers. Sources
//! share one fetcher and one coordinator per job and report progress
//! through the job's [`ProgressSink`].

mod featured_customers;
mod review_site;
mod search_engine;
mod subdomain;
mod tech_lookup;
mod vendor_site;

pub use featured_customers::FeaturedCustomersScraper;
pub use review_site::ReviewSiteScraper;
pub use search_engine::SearchEngineScraper;
pub use subdomain::SubdomainEnumerationScraper;
pub use tech_lookup::TechLookupScraper;
pub use vendor_site::VendorSiteScraper;

use crate::config::Config;
use crate::crawler::{parse_html, Coordinator, Fetcher, ParsedPage, TaskError};
use crate::jobs::ProgressSink;
use crate::state::{CandidateRecord, SourceKind};
use crate::ParseError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Source-level failure; the job carries on with the other sources
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{source_name}: entry page unavailable: {error}")]
    EntryPage {
        source_name: String,
        error: TaskError,
    },

    #[error("{source_name}: all {attempted} requests failed")]
    AllRequestsFailed {
        source_name: String,
        attempted: usize,
    },
}

/// Capability shared by every customer source
#[async_trait]
pub trait CustomerSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Human-readable name used in logs and `source_name`
    fn name(&self) -> &str;

    /// Collects at most `max_results` unique candidates for `vendor_name`
    async fn produce(
        &self,
        vendor_name: &str,
        max_results: usize,
        progress: &ProgressSink,
    ) -> Result<Vec<CandidateRecord>, SourceError>;
}

/// What every source needs to reach the network
#[derive(Clone)]
pub struct SourceContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub coordinator: Coordinator,
    /// Per-request timeout
    pub timeout: Duration,
}

impl SourceContext {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &Config) -> Self {
        Self {
            fetcher,
            coordinator: Coordinator::new(&config.coordinator),
            timeout: Duration::from_millis(config.fetcher.request_timeout_ms),
        }
    }

    /// Fetches a source's entry page with the coordinator's retry policy
    ///
    /// The outcome is reported as a checked page either way.
    pub async fn fetch_entry(
        &self,
        kind: SourceKind,
        source_name: &str,
        url: &str,
        progress: &ProgressSink,
    ) -> Result<FetchedPage, SourceError> {
        let retry = self.coordinator.scheduler().retry_policy();
        let fetcher = self.fetcher.as_ref();

        match retry
            .run(|| fetch_page(fetcher, url, self.timeout), TaskError::is_retryable)
            .await
        {
            Ok(page) => {
                progress.page_checked(kind, url, true, 0);
                Ok(page)
            }
            Err(error) => {
                tracing::warn!("[{}] entry page {} failed: {}", source_name, url, error);
                progress.page_checked(kind, url, false, 0);
                Err(SourceError::EntryPage {
                    source_name: source_name.to_string(),
                    error,
                })
            }
        }
    }
}

/// A fetched and parsed HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,
    pub html: String,
    pub parsed: ParsedPage,
}

/// Fetches `url` and parses it as HTML
pub async fn fetch_page(
    fetcher: &dyn Fetcher,
    url: &str,
    timeout: Duration,
) -> Result<FetchedPage, TaskError> {
    let page = fetcher.fetch(url, timeout).await?;

    let base = Url::parse(&page.final_url)
        .or_else(|_| Url::parse(url))
        .map_err(|e| ParseError::UnexpectedStructure {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    if !page.is_html() {
        return Err(ParseError::UnexpectedStructure {
            url: url.to_string(),
            message: format!("not an HTML page ({})", page.content_type),
        }
        .into());
    }

    let parsed = parse_html(&page.body, &base)?;
    Ok(FetchedPage {
        url: base,
        html: page.body,
        parsed,
    })
}

/// Builds the enabled sources in their fixed job order
pub fn build_sources(config: &Config, ctx: SourceContext) -> Vec<Arc<dyn CustomerSource>> {
    let mut sources: Vec<Arc<dyn CustomerSource>> = Vec::new();

    if config.vendor_site.enabled {
        sources.push(Arc::new(VendorSiteScraper::new(
            config.vendor_site.clone(),
            ctx.clone(),
        )));
    }
    if config.featured_customers.enabled {
        sources.push(Arc::new(FeaturedCustomersScraper::new(
            config.featured_customers.clone(),
            ctx.clone(),
        )));
    }
    if config.search_engine.enabled {
        sources.push(Arc::new(SearchEngineScraper::new(
            config.search_engine.clone(),
            ctx.clone(),
        )));
    }
    if config.subdomain.enabled {
        sources.push(Arc::new(SubdomainEnumerationScraper::new(
            config.subdomain.clone(),
            ctx.clone(),
        )));
    }
    for site in &config.review_sites {
        sources.push(Arc::new(ReviewSiteScraper::new(site.clone(), ctx.clone())));
    }
    for site in &config.tech_lookups {
        sources.push(Arc::new(TechLookupScraper::new(site.clone(), ctx.clone())));
    }

    sources
}

/// Orders candidates by discovery position, drops repeated dedup keys
/// and keeps at most `max_results`
pub(crate) fn cap_unique(mut records: Vec<CandidateRecord>, max_results: usize) -> Vec<CandidateRecord> {
    records.sort_by_key(|r| r.order);

    let mut seen = HashSet::new();
    records.retain(|r| seen.insert(r.dedup_key()));
    if max_results > 0 {
        records.truncate(max_results);
    }
    records
}

/// `https://<host>` for a link, the form customer URLs are reported in
pub(crate) fn site_root(url: &Url) -> Option<String> {
    url.host_str()
        .map(|host| format!("https://{}", host.to_lowercase()))
}
