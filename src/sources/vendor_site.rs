//! The vendor's own website
//!
//! The homepage is guessed from the vendor name. Logo walls on the
//! homepage give name-only candidates; customer pages (linked from the
//! homepage or at well-known paths) are fetched through the coordinator
//! and mined for outbound customer links, logo walls and story headings.

use super::{cap_unique, fetch_page, site_root, CustomerSource, FetchedPage, SourceContext, SourceError};
use crate::config::VendorSiteConfig;
use crate::crawler::{extract_logo_names, story_customer_name, TaskError};
use crate::jobs::ProgressSink;
use crate::state::{CandidateRecord, SourceKind};
use crate::url::{extract_domain, fill_template, is_external, is_vendor_domain, vendor_slug};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Anchor texts that never name a customer
const GENERIC_LINK_TEXT: &[&str] = &[
    "read more",
    "learn more",
    "read the story",
    "read story",
    "view case study",
    "watch video",
    "contact us",
    "privacy policy",
    "terms",
];

/// Longest anchor text still treated as a company name
const MAX_NAME_WORDS: usize = 5;

pub struct VendorSiteScraper {
    config: VendorSiteConfig,
    ctx: SourceContext,
}

impl VendorSiteScraper {
    pub fn new(config: VendorSiteConfig, ctx: SourceContext) -> Self {
        Self { config, ctx }
    }

    /// Customer pages linked from the homepage plus the configured paths
    fn customer_pages(&self, home: &FetchedPage) -> Vec<String> {
        let mut seen = HashSet::new();
        seen.insert(home.url.as_str().trim_end_matches('/').to_string());

        let linked = home
            .parsed
            .links
            .iter()
            .filter(|link| !is_external(&link.url, &home.url))
            .filter(|link| {
                let path = link.url.path().to_lowercase();
                self.config
                    .customer_keywords
                    .iter()
                    .any(|k| path.contains(&k.to_lowercase()))
            })
            .map(|link| link.url.clone());

        let configured = self
            .config
            .customer_paths
            .iter()
            .filter_map(|path| home.url.join(path).ok());

        linked
            .chain(configured)
            .map(|mut url| {
                url.set_query(None);
                url.to_string()
            })
            .filter(|url| seen.insert(url.trim_end_matches('/').to_string()))
            .collect()
    }
}

#[async_trait]
impl CustomerSource for VendorSiteScraper {
    fn kind(&self) -> SourceKind {
        SourceKind::VendorSite
    }

    fn name(&self) -> &str {
        "vendor_site"
    }

    async fn produce(
        &self,
        vendor_name: &str,
        max_results: usize,
        progress: &ProgressSink,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        let homepage = fill_template(
            &self.config.domain_template,
            &[("vendor", &vendor_slug(vendor_name))],
        );
        tracing::info!("[vendor_site] scanning {} for {}", homepage, vendor_name);

        let home = self
            .ctx
            .fetch_entry(self.kind(), self.name(), &homepage, progress)
            .await?;

        let mut records: Vec<CandidateRecord> = extract_logo_names(&home.html)
            .into_iter()
            .filter(|name| !name.eq_ignore_ascii_case(vendor_name))
            .enumerate()
            .map(|(item, name)| {
                CandidateRecord::new(self.kind(), "vendor_site:logos", name, None, 0, item as u32)
            })
            .collect();

        let pages = self.customer_pages(&home);
        tracing::debug!(
            "[vendor_site] {} logo names, {} customer pages",
            records.len(),
            pages.len()
        );

        let fetcher = Arc::clone(&self.ctx.fetcher);
        let timeout = self.ctx.timeout;
        let vendor = vendor_name.to_string();

        let report = self
            .ctx
            .coordinator
            .run(self.kind(), pages, max_results, progress, move |index, url| {
                let fetcher = Arc::clone(&fetcher);
                let vendor = vendor.clone();
                async move {
                    let page = fetch_page(fetcher.as_ref(), &url, timeout).await?;
                    Ok::<_, TaskError>(customer_page_records(&vendor, &page, index + 1))
                }
            })
            .await;

        records.extend(report.records);
        Ok(cap_unique(records, max_results))
    }
}

/// Candidates on one customer page, found by unit of work `task`
fn customer_page_records(vendor_name: &str, page: &FetchedPage, task: u32) -> Vec<CandidateRecord> {
    let source_name = format!("vendor_site:{}", page.url.path());
    let mut found: Vec<(String, Option<String>)> = Vec::new();

    for heading in &page.parsed.headings {
        if let Some(name) = story_customer_name(heading) {
            found.push((name, None));
        }
    }

    for name in extract_logo_names(&page.html) {
        found.push((name, None));
    }

    for link in &page.parsed.links {
        if !is_external(&link.url, &page.url) || !looks_like_company_name(&link.text) {
            continue;
        }
        let own_site = extract_domain(&link.url)
            .map(|domain| is_vendor_domain(&domain, vendor_name))
            .unwrap_or(true);
        if own_site {
            continue;
        }
        found.push((link.text.clone(), site_root(&link.url)));
    }

    found
        .into_iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case(vendor_name))
        .enumerate()
        .map(|(item, (name, url))| {
            CandidateRecord::new(SourceKind::VendorSite, source_name.as_str(), name, url, task, item as u32)
        })
        .collect()
}

fn looks_like_company_name(text: &str) -> bool {
    let lower = text.to_lowercase();
    let words = text.split_whitespace().count();
    (1..=MAX_NAME_WORDS).contains(&words)
        && !GENERIC_LINK_TEXT.iter().any(|g| lower == *g)
        && Url::parse(text).is_err()
}

#[cfg(test)]
mod tests {
    use super::super::testing::{test_config, ScriptedFetcher};
    use super::*;

    const HOME: &str = r#"<html><head><title>Acme</title></head><body>
        <a href="/customers">Our customers</a>
        <a href="/pricing">Pricing</a>
        <div class="customer-logos"><img alt="Globex logo"><img alt="Initech"></div>
    </body></html>"#;

    const CUSTOMERS: &str = r#"<html><body>
        <h2>Hooli Case Study</h2>
        <a href="https://www.umbrella.com/">Umbrella Corp</a>
        <a href="https://blog.acme.com/post">Acme Blog</a>
        <a href="https://twitter.test/acme">Read more</a>
        <a href="/customers/hooli">Hooli story</a>
    </body></html>"#;

    fn scraper(fetcher: ScriptedFetcher) -> VendorSiteScraper {
        let config = test_config();
        let ctx = SourceContext::new(Arc::new(fetcher), &config);
        VendorSiteScraper::new(config.vendor_site, ctx)
    }

    #[tokio::test]
    async fn test_collects_logos_stories_and_outbound_links() {
        let fetcher = ScriptedFetcher::new()
            .page("https://www.acme.com", HOME)
            .page("https://www.acme.com/customers", CUSTOMERS);

        let records = scraper(fetcher)
            .produce("Acme", 20, &ProgressSink::disabled())
            .await
            .unwrap();

        let names: Vec<_> = records.iter().map(|r| r.raw_name.as_str()).collect();
        assert_eq!(names, vec!["Globex", "Initech", "Hooli", "Umbrella Corp"]);

        let umbrella = records.iter().find(|r| r.raw_name == "Umbrella Corp").unwrap();
        assert_eq!(umbrella.raw_url.as_deref(), Some("https://www.umbrella.com"));
        assert!(records.iter().all(|r| r.source == SourceKind::VendorSite));
    }

    #[tokio::test]
    async fn test_homepage_failure_is_source_error() {
        let result = scraper(ScriptedFetcher::new())
            .produce("Acme", 20, &ProgressSink::disabled())
            .await;
        assert!(matches!(result, Err(SourceError::EntryPage { .. })));
    }

    #[tokio::test]
    async fn test_missing_customer_page_is_tolerated() {
        let fetcher = ScriptedFetcher::new().page("https://www.acme.com", HOME);
        let records = scraper(fetcher)
            .produce("Acme", 20, &ProgressSink::disabled())
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_output_is_capped() {
        let fetcher = ScriptedFetcher::new()
            .page("https://www.acme.com", HOME)
            .page("https://www.acme.com/customers", CUSTOMERS);
        let records = scraper(fetcher)
            .produce("Acme", 1, &ProgressSink::disabled())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_name, "Globex");
    }

    #[test]
    fn test_looks_like_company_name() {
        assert!(looks_like_company_name("Umbrella Corp"));
        assert!(!looks_like_company_name("Read more"));
        assert!(!looks_like_company_name(""));
        assert!(!looks_like_company_name("https://umbrella.com"));
        assert!(!looks_like_company_name("one two three four five six"));
    }
}
