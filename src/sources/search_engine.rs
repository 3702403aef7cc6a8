//! Templated web search queries
//!
//! Each query is one coordinator task against an HTML search endpoint.
//! Customer names are read from result titles:
//! - "Globex - Acme Case Study" gives "Globex"
//! - "How Globex chose Acme" gives "Globex"
//!
//! Results hosted on the vendor's own domain are skipped.

use super::{cap_unique, fetch_page, CustomerSource, FetchedPage, SourceContext, SourceError};
use crate::config::SearchEngineConfig;
use crate::crawler::{Link, TaskError};
use crate::jobs::ProgressSink;
use crate::state::{CandidateRecord, SourceKind};
use crate::url::{encode_query, extract_domain, fill_template, is_external, is_vendor_domain};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

const STORY_MARKERS: &[&str] = &["case study", "success story"];
const ADOPTION_VERBS: &[&str] = &["chose", "selected", "uses"];
const LEADING_WORDS: &[&str] = &["how ", "why ", "when "];
const TITLE_SEPARATORS: &[&str] = &[" - ", " | "];

/// Query parameter some engines use to wrap the real result URL
const REDIRECT_PARAM: &str = "uddg";

/// Names of this many words or more are phrases, not companies
const MAX_NAME_WORDS: usize = 5;

pub struct SearchEngineScraper {
    config: SearchEngineConfig,
    ctx: SourceContext,
}

impl SearchEngineScraper {
    pub fn new(config: SearchEngineConfig, ctx: SourceContext) -> Self {
        Self { config, ctx }
    }

    fn query_urls(&self, vendor_name: &str) -> Vec<String> {
        self.config
            .queries
            .iter()
            .map(|q| fill_template(q, &[("vendor", vendor_name)]))
            .map(|q| fill_template(&self.config.search_url, &[("query", &encode_query(&q))]))
            .collect()
    }
}

#[async_trait]
impl CustomerSource for SearchEngineScraper {
    fn kind(&self) -> SourceKind {
        SourceKind::SearchEngine
    }

    fn name(&self) -> &str {
        "search_engine"
    }

    async fn produce(
        &self,
        vendor_name: &str,
        max_results: usize,
        progress: &ProgressSink,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        let queries = self.query_urls(vendor_name);
        let attempted = queries.len();
        tracing::info!("[search_engine] running {} queries for {}", attempted, vendor_name);

        let fetcher = Arc::clone(&self.ctx.fetcher);
        let timeout = self.ctx.timeout;
        let vendor = vendor_name.to_string();

        let report = self
            .ctx
            .coordinator
            .run(self.kind(), queries, max_results, progress, move |index, url| {
                let fetcher = Arc::clone(&fetcher);
                let vendor = vendor.clone();
                async move {
                    let page = fetch_page(fetcher.as_ref(), &url, timeout).await?;
                    Ok::<_, TaskError>(result_records(&vendor, &page, &url, index))
                }
            })
            .await;

        if attempted > 0 && report.completed == 0 && report.failed == report.dispatched {
            return Err(SourceError::AllRequestsFailed {
                source_name: self.name().to_string(),
                attempted: report.dispatched,
            });
        }

        Ok(cap_unique(report.records, max_results))
    }
}

fn result_records(vendor_name: &str, page: &FetchedPage, query_url: &str, task: u32) -> Vec<CandidateRecord> {
    let source_name = format!("search_engine:{}", query_url);

    page.parsed
        .links
        .iter()
        .filter_map(|link| {
            let target = result_target(link);
            if !is_external(&target, &page.url) {
                return None;
            }
            let domain = extract_domain(&target)?;
            if is_vendor_domain(&domain, vendor_name) {
                tracing::debug!("[search_engine] skipping vendor result {}", domain);
                return None;
            }
            let name = customer_from_title(&link.text, vendor_name)?;
            Some((name, domain))
        })
        .enumerate()
        .map(|(item, (name, domain))| {
            CandidateRecord::new(
                SourceKind::SearchEngine,
                source_name.as_str(),
                name,
                Some(domain),
                task,
                item as u32,
            )
        })
        .collect()
}

/// The real destination of a result link, unwrapping engine redirects
fn result_target(link: &Link) -> Url {
    link.url
        .query_pairs()
        .find(|(key, _)| key == REDIRECT_PARAM)
        .and_then(|(_, value)| Url::parse(&value).ok())
        .unwrap_or_else(|| link.url.clone())
}

/// Customer name implied by a search result title, if any
fn customer_from_title(title: &str, vendor_name: &str) -> Option<String> {
    let lower = title.to_ascii_lowercase();
    let vendor_lower = vendor_name.to_ascii_lowercase();

    let mut name = None;

    if STORY_MARKERS.iter().any(|m| lower.contains(m)) {
        name = TITLE_SEPARATORS
            .iter()
            .filter_map(|sep| title.find(sep))
            .min()
            .map(|cut| title[..cut].trim().to_string())
            .filter(|n| !n.is_empty());
    }

    if name.is_none()
        && ADOPTION_VERBS
            .iter()
            .any(|verb| lower.contains(&format!("{} {}", verb, vendor_lower)))
    {
        name = lower
            .find(&vendor_lower)
            .map(|idx| title[..idx].trim().to_string())
            .map(|before| strip_trailing_verb(&before))
            .filter(|n| !n.is_empty() && n.split_whitespace().count() < MAX_NAME_WORDS);
    }

    name.map(|n| strip_leading_words(&n))
        .filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case(vendor_name))
}

fn strip_trailing_verb(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    ADOPTION_VERBS
        .iter()
        .find(|verb| lower.ends_with(&format!(" {}", verb)))
        .map(|verb| text[..text.len() - verb.len()].trim().to_string())
        .unwrap_or_else(|| text.to_string())
}

fn strip_leading_words(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    LEADING_WORDS
        .iter()
        .find(|w| lower.starts_with(*w))
        .map(|w| name[w.len()..].trim().to_string())
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{test_config, ScriptedFetcher};
    use super::*;

    #[test]
    fn test_story_title() {
        assert_eq!(
            customer_from_title("Globex - Acme Case Study", "Acme"),
            Some("Globex".to_string())
        );
        assert_eq!(
            customer_from_title("Initech | Acme success story", "Acme"),
            Some("Initech".to_string())
        );
        assert_eq!(customer_from_title("Acme case study", "Acme"), None);
    }

    #[test]
    fn test_adoption_title() {
        assert_eq!(
            customer_from_title("How Globex chose Acme for analytics", "Acme"),
            Some("Globex".to_string())
        );
        assert_eq!(
            customer_from_title("Why Hooli selected Acme", "acme"),
            Some("Hooli".to_string())
        );
        assert_eq!(
            customer_from_title("The largest bank in the whole region uses Acme", "Acme"),
            None
        );
        assert_eq!(customer_from_title("Acme pricing", "Acme"), None);
    }

    #[test]
    fn test_result_target_unwraps_redirect() {
        let link = Link {
            url: Url::parse("https://search.test/l/?uddg=https%3A%2F%2Fglobex.com%2Fnews&rut=x").unwrap(),
            text: "Globex".to_string(),
        };
        assert_eq!(result_target(&link).as_str(), "https://globex.com/news");
    }

    fn scraper(fetcher: ScriptedFetcher, queries: &[&str]) -> SearchEngineScraper {
        let mut config = test_config();
        config.search_engine.search_url = "https://search.test/html/?q={query}".to_string();
        config.search_engine.queries = queries.iter().map(|q| q.to_string()).collect();
        let ctx = SourceContext::new(Arc::new(fetcher), &config);
        SearchEngineScraper::new(config.search_engine, ctx)
    }

    #[tokio::test]
    async fn test_collects_results_and_skips_vendor_domain() {
        let results = r#"<html><body>
            <a href="https://globex.com/story">Globex - Acme Case Study</a>
            <a href="https://www.acme.com/customers/hooli">Hooli - Acme Case Study</a>
            <a href="https://news.test/initech">How Initech chose Acme</a>
            <a href="/html/?q=next">Next page</a>
        </body></html>"#;
        let fetcher = ScriptedFetcher::new()
            .page("https://search.test/html/?q=Acme+customers", results);

        let records = scraper(fetcher, &["{vendor} customers", "{vendor} case study"])
            .produce("Acme", 10, &ProgressSink::disabled())
            .await
            .unwrap();

        let found: Vec<_> = records
            .iter()
            .map(|r| (r.raw_name.as_str(), r.raw_url.as_deref()))
            .collect();
        assert_eq!(
            found,
            vec![("Globex", Some("globex.com")), ("Initech", Some("news.test"))]
        );
    }

    #[tokio::test]
    async fn test_all_queries_failing_is_source_error() {
        let result = scraper(ScriptedFetcher::new(), &["{vendor} customers"])
            .produce("Acme", 10, &ProgressSink::disabled())
            .await;
        assert!(matches!(
            result,
            Err(SourceError::AllRequestsFailed { attempted: 1, .. })
        ));
    }
}
