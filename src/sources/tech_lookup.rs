//! Technology-usage indexes (BuiltWith, PublicWWW and the like)
//!
//! These sites list websites whose pages embed a given product. Each
//! outbound link inside a marked section is a site running the vendor's
//! code, and so a likely customer.

use super::{cap_unique, site_root, CustomerSource, FetchedPage, SourceContext, SourceError};
use crate::config::TechLookupEntry;
use crate::crawler::{extract_section_links, Link};
use crate::jobs::ProgressSink;
use crate::state::{CandidateRecord, SourceKind};
use crate::url::{encode_query, extract_domain, fill_template, is_external, is_vendor_domain};
use async_trait::async_trait;

pub struct TechLookupScraper {
    site: TechLookupEntry,
    ctx: SourceContext,
}

impl TechLookupScraper {
    pub fn new(site: TechLookupEntry, ctx: SourceContext) -> Self {
        Self { site, ctx }
    }

    fn site_records(&self, vendor_name: &str, page: &FetchedPage) -> Vec<CandidateRecord> {
        let markers: Vec<String> = self
            .site
            .section_markers
            .iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        let markers: Vec<&str> = markers.iter().map(String::as_str).collect();

        extract_section_links(&page.html, &page.url, &markers)
            .iter()
            .filter(|link| is_external(&link.url, &page.url))
            .filter_map(|link| listed_site(vendor_name, link))
            .enumerate()
            .map(|(n, (name, url))| {
                CandidateRecord::new(SourceKind::TechLookup, &self.site.name, name, url, 0, n as u32)
            })
            .collect()
    }
}

/// Customer name and site root for one listed link
///
/// Listings often show the bare domain as anchor text; the name then comes
/// from the domain's registrable label.
fn listed_site(vendor_name: &str, link: &Link) -> Option<(String, Option<String>)> {
    let domain = extract_domain(&link.url)?;
    if is_vendor_domain(&domain, vendor_name) {
        return None;
    }

    let text = link.text.trim();
    let name = if text.is_empty() || looks_like_domain(text) {
        name_from_domain(&domain)?
    } else {
        text.to_string()
    };

    if name.chars().count() <= 2 || name.eq_ignore_ascii_case(vendor_name.trim()) {
        return None;
    }
    Some((name, site_root(&link.url)))
}

fn looks_like_domain(text: &str) -> bool {
    !text.contains(char::is_whitespace) && text.contains('.')
}

/// `shop.globex.co` -> `Globex`
fn name_from_domain(domain: &str) -> Option<String> {
    let labels: Vec<&str> = domain.trim_start_matches("www.").split('.').collect();
    if labels.len() < 2 {
        return None;
    }
    let label = labels[labels.len() - 2];
    let mut chars = label.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

#[async_trait]
impl CustomerSource for TechLookupScraper {
    fn kind(&self) -> SourceKind {
        SourceKind::TechLookup
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
        let lookup_url = fill_template(&self.site.lookup_url, &[("vendor", &encode_query(vendor_name))]);
        let page = self
            .ctx
            .fetch_entry(self.kind(), self.name(), &lookup_url, progress)
            .await?;

        let records = self.site_records(vendor_name, &page);
        tracing::info!("[{}] {} listed sites for {}", self.site.name, records.len(), vendor_name);

        Ok(cap_unique(records, max_results))
    }
}
