//! FeaturedCustomers-style directory
//!
//! Searches the directory for the vendor, follows the vendor profile and
//! reads customer names out of the profile's customer sections.

use super::{cap_unique, fetch_page, site_root, CustomerSource, FetchedPage, SourceContext, SourceError};
use crate::config::FeaturedCustomersConfig;
use crate::crawler::{extract_section_items, TaskError};
use crate::jobs::{LogLevel, ProgressSink};
use crate::state::{CandidateRecord, SourceKind};
use crate::url::{encode_query, is_external};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

const PROFILE_MARKER: &str = "/vendor/";

pub struct FeaturedCustomersScraper {
    config: FeaturedCustomersConfig,
    ctx: SourceContext,
}

impl FeaturedCustomersScraper {
    pub fn new(config: FeaturedCustomersConfig, ctx: SourceContext) -> Self {
        Self { config, ctx }
    }

    fn search_url(&self, vendor_name: &str) -> String {
        format!(
            "{}/search?q={}",
            self.config.base_url.trim_end_matches('/'),
            encode_query(vendor_name)
        )
    }
}

/// The vendor's profile link on a search results page
///
/// A `/vendor/` link naming the vendor in its path or text wins; otherwise
/// the first `/vendor/` link is taken.
fn find_profile(search: &FetchedPage, vendor_name: &str) -> Option<Url> {
    let vendor_lower = vendor_name.to_lowercase();
    let vendor_path = format!(
        "{}{}",
        PROFILE_MARKER,
        vendor_lower.split_whitespace().collect::<Vec<_>>().join("-")
    );

    let profiles: Vec<_> = search
        .parsed
        .links
        .iter()
        .filter(|link| link.url.path().to_lowercase().contains(PROFILE_MARKER))
        .collect();

    profiles
        .iter()
        .find(|link| {
            link.url.path().to_lowercase().starts_with(&vendor_path)
                || link.text.to_lowercase().contains(&vendor_lower)
        })
        .or_else(|| profiles.first())
        .map(|link| link.url.clone())
}

fn profile_records(vendor_name: &str, page: &FetchedPage, task: u32) -> Vec<CandidateRecord> {
    extract_section_items(&page.html, &page.url, &["customer"], &["name"])
        .into_iter()
        .filter(|item| item.text.chars().count() > 2 && !item.text.eq_ignore_ascii_case(vendor_name))
        .enumerate()
        .map(|(n, item)| {
            let url = item
                .link
                .filter(|link| is_external(link, &page.url))
                .and_then(|link| site_root(&link));
            CandidateRecord::new(
                SourceKind::FeaturedCustomers,
                "featured_customers",
                item.text,
                url,
                task,
                n as u32,
            )
        })
        .collect()
}

#[async_trait]
impl CustomerSource for FeaturedCustomersScraper {
    fn kind(&self) -> SourceKind {
        SourceKind::FeaturedCustomers
    }

    fn name(&self) -> &str {
        "featured_customers"
    }

    async fn produce(
        &self,
        vendor_name: &str,
        max_results: usize,
        progress: &ProgressSink,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        let search_url = self.search_url(vendor_name);
        let search = self
            .ctx
            .fetch_entry(self.kind(), self.name(), &search_url, progress)
            .await?;

        let Some(profile) = find_profile(&search, vendor_name) else {
            tracing::info!("[featured_customers] no vendor profile for {}", vendor_name);
            progress.log(
                LogLevel::Info,
                format!("FeaturedCustomers has no profile for {}", vendor_name),
            );
            return Ok(Vec::new());
        };
        tracing::debug!("[featured_customers] profile {}", profile);

        let fetcher = Arc::clone(&self.ctx.fetcher);
        let timeout = self.ctx.timeout;
        let vendor = vendor_name.to_string();

        let report = self
            .ctx
            .coordinator
            .run(
                self.kind(),
                vec![profile.to_string()],
                max_results,
                progress,
                move |index, url| {
                    let fetcher = Arc::clone(&fetcher);
                    let vendor = vendor.clone();
                    async move {
                        let page = fetch_page(fetcher.as_ref(), &url, timeout).await?;
                        Ok::<_, TaskError>(profile_records(&vendor, &page, index))
                    }
                },
            )
            .await;

        Ok(cap_unique(report.records, max_results))
    }
}
