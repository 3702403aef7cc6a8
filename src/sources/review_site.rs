//! Review sites (PeerSpot, TrustRadius and the like)
//!
//! Reviewer company names are read from review and testimonial sections of
//! both the search page and the vendor's product profile.

use super::{cap_unique, fetch_page, CustomerSource, FetchedPage, SourceContext, SourceError};
use crate::config::ReviewSiteEntry;
use crate::crawler::{extract_section_items, TaskError};
use crate::jobs::ProgressSink;
use crate::state::{CandidateRecord, SourceKind};
use crate::url::{encode_query, fill_template};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

const REVIEW_SECTIONS: &[&str] = &["review", "testimonial"];
const COMPANY_ITEMS: &[&str] = &["company", "organization"];

pub struct ReviewSiteScraper {
    site: ReviewSiteEntry,
    ctx: SourceContext,
}

impl ReviewSiteScraper {
    pub fn new(site: ReviewSiteEntry, ctx: SourceContext) -> Self {
        Self { site, ctx }
    }

    /// The product link naming the vendor, else the first product link
    fn find_product(&self, search: &FetchedPage, vendor_name: &str) -> Option<Url> {
        let vendor_lower = vendor_name.to_lowercase();
        let products: Vec<_> = search
            .parsed
            .links
            .iter()
            .filter(|link| {
                let path = link.url.path().to_lowercase();
                self.site
                    .profile_markers
                    .iter()
                    .any(|m| path.contains(&m.to_lowercase()))
            })
            .collect();

        products
            .iter()
            .find(|link| link.text.to_lowercase().contains(&vendor_lower))
            .or_else(|| products.first())
            .map(|link| link.url.clone())
    }
}

fn review_records(site_name: &str, vendor_name: &str, page: &FetchedPage, task: u32) -> Vec<CandidateRecord> {
    extract_section_items(&page.html, &page.url, REVIEW_SECTIONS, COMPANY_ITEMS)
        .into_iter()
        .filter(|item| !item.text.eq_ignore_ascii_case(vendor_name))
        .enumerate()
        .map(|(n, item)| {
            CandidateRecord::new(SourceKind::ReviewSite, site_name, item.text, None, task, n as u32)
        })
        .collect()
}

#[async_trait]
impl CustomerSource for ReviewSiteScraper {
    fn kind(&self) -> SourceKind {
        SourceKind::ReviewSite
    }

    fn name(&self) -> &str {
        &self.site.name
    }

    async fn produce(
        &self,
        vendor_name: &str,
        max_results: usize,
        progress: &ProgressSink,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        let search_url = fill_template(&self.site.search_url, &[("vendor", &encode_query(vendor_name))]);
        let search = self
            .ctx
            .fetch_entry(self.kind(), self.name(), &search_url, progress)
            .await?;

        let mut records = review_records(&self.site.name, vendor_name, &search, 0);
        let profile = self.find_product(&search, vendor_name);
        tracing::debug!(
            "[{}] {} companies on search page, profile {:?}",
            self.site.name,
            records.len(),
            profile.as_ref().map(Url::as_str)
        );

        if let Some(profile) = profile {
            let fetcher = Arc::clone(&self.ctx.fetcher);
            let timeout = self.ctx.timeout;
            let vendor = vendor_name.to_string();
            let site_name = self.site.name.clone();

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
                        let site_name = site_name.clone();
                        async move {
                            let page = fetch_page(fetcher.as_ref(), &url, timeout).await?;
                            Ok::<_, TaskError>(review_records(&site_name, &vendor, &page, index + 1))
                        }
                    },
                )
                .await;
            records.extend(report.records);
        }

        Ok(cap_unique(records, max_results))
    }
}
