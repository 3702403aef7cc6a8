//! Enumerated customer pages under a fixed URL pattern
//!
//! The slug set is the index page's links that fit `page-pattern`, followed
//! by the configured seed slugs, deduplicated in first-seen order. Each
//! slug's page is fetched through the coordinator; the page title names the
//! customer and the first outbound link gives its URL.

use super::{cap_unique, fetch_page, site_root, CustomerSource, FetchedPage, SourceContext, SourceError};
use crate::config::SubdomainConfig;
use crate::crawler::{title_customer_name, TaskError};
use crate::jobs::{LogLevel, ProgressEvent, ProgressSink};
use crate::state::{CandidateRecord, SourceKind};
use crate::url::{extract_domain, fill_template, is_external, is_vendor_domain, vendor_slug};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

pub struct SubdomainEnumerationScraper {
    config: SubdomainConfig,
    ctx: SourceContext,
}

/// `page-pattern` split around `{slug}`, with the vendor filled in
#[derive(Debug, Clone)]
struct SlugPattern {
    prefix: String,
    suffix: String,
}

impl SlugPattern {
    fn new(pattern: &str, vendor_slug: &str) -> Self {
        let filled = fill_template(pattern, &[("vendor", vendor_slug)]);
        let (prefix, suffix) = filled.split_once("{slug}").unwrap_or((filled.as_str(), ""));
        Self {
            prefix: comparable(prefix),
            suffix: comparable(suffix),
        }
    }

    /// Slug of a link that fits the pattern, in the link's own case
    fn slug_of(&self, link: &Url) -> Option<String> {
        let mut link = link.clone();
        link.set_query(None);
        link.set_fragment(None);
        let link = strip_scheme(link.as_str());
        // Url output is ASCII, so byte offsets agree between the two
        let lower = link.to_ascii_lowercase();

        let lower_rest = lower.strip_prefix(&self.prefix)?;
        let rest = &link[self.prefix.len()..];
        let rest = match lower_rest.strip_suffix(&self.suffix) {
            Some(kept) => &rest[..kept.len()],
            None => rest,
        };
        let slug = rest.trim_matches('/');
        if slug.is_empty() || slug.contains('/') {
            None
        } else {
            Some(slug.to_string())
        }
    }
}

/// Lowercase, scheme and `www.` removed, so http/https and www variants compare equal
fn comparable(url: &str) -> String {
    strip_scheme(url).to_lowercase()
}

fn strip_scheme(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    match rest.get(..4) {
        Some(www) if www.eq_ignore_ascii_case("www.") => &rest[4..],
        _ => rest,
    }
}

impl SubdomainEnumerationScraper {
    pub fn new(config: SubdomainConfig, ctx: SourceContext) -> Self {
        Self { config, ctx }
    }

    /// Index-page slugs first, then seeds, without case-insensitive repeats
    fn slug_set(&self, index: Option<&FetchedPage>, pattern: &SlugPattern) -> Vec<String> {
        let linked = index
            .into_iter()
            .flat_map(|page| page.parsed.links.iter())
            .filter_map(|link| pattern.slug_of(&link.url));
        let seeds = self
            .config
            .seed_slugs
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut seen = HashSet::new();
        linked
            .chain(seeds)
            .filter(|s| seen.insert(s.to_lowercase()))
            .collect()
    }
}

#[async_trait]
impl CustomerSource for SubdomainEnumerationScraper {
    fn kind(&self) -> SourceKind {
        SourceKind::SubdomainEnumeration
    }

    fn name(&self) -> &str {
        "subdomain_enumeration"
    }

    async fn produce(
        &self,
        vendor_name: &str,
        max_results: usize,
        progress: &ProgressSink,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        let slug = vendor_slug(vendor_name);
        let index_url = fill_template(&self.config.index_url, &[("vendor", &slug)]);
        let pattern = SlugPattern::new(&self.config.page_pattern, &slug);

        let index = match self
            .ctx
            .fetch_entry(self.kind(), self.name(), &index_url, progress)
            .await
        {
            Ok(page) => Some(page),
            Err(e) if !self.config.seed_slugs.is_empty() => {
                progress.log(
                    LogLevel::Warning,
                    format!("Customer index unavailable, using seed slugs only: {}", e),
                );
                None
            }
            Err(e) => return Err(e),
        };

        let slugs = self.slug_set(index.as_ref(), &pattern);
        tracing::info!("[subdomain] {} customer pages to check", slugs.len());
        progress.emit(ProgressEvent::SlugsDiscovered {
            source: self.kind(),
            count: slugs.len(),
        });

        let pages: Vec<String> = slugs
            .iter()
            .map(|s| fill_template(&self.config.page_pattern, &[("vendor", &slug), ("slug", s)]))
            .collect();

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
                    Ok::<_, TaskError>(customer_page_record(&vendor, &page, index).into_iter().collect::<Vec<_>>())
                }
            })
            .await;

        // Without the index, a run where no page answered reached nothing
        if index.is_none() && report.dispatched > 0 && report.completed == 0 {
            return Err(SourceError::AllRequestsFailed {
                source_name: self.name().to_string(),
                attempted: report.dispatched,
            });
        }

        Ok(cap_unique(report.records, max_results))
    }
}

fn customer_page_record(vendor_name: &str, page: &FetchedPage, task: u32) -> Option<CandidateRecord> {
    let name = page
        .parsed
        .title
        .as_deref()
        .and_then(title_customer_name)
        .filter(|n| !n.eq_ignore_ascii_case(vendor_name))?;

    let url = page
        .parsed
        .links
        .iter()
        .filter(|link| is_external(&link.url, &page.url))
        .find(|link| {
            extract_domain(&link.url)
                .map(|d| !is_vendor_domain(&d, vendor_name))
                .unwrap_or(false)
        })
        .and_then(|link| site_root(&link.url));

    Some(CandidateRecord::new(
        SourceKind::SubdomainEnumeration,
        format!("subdomain:{}", page.url.path()),
        name,
        url,
        task,
        0,
    ))
}
