//! HTML parser for extracting customer references
//!
//! This module handles parsing HTML content to extract:
//! - Links with their anchor text
//! - Page title and headings
//! - Logo walls (image alt text inside logo/customer sections)
//! - Items inside class-named sections (directory listings, review cards)
//!
//! Parsing is synchronous and never holds a document across an await.

use crate::ParseError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Class fragments that mark a logo wall
const LOGO_SECTION_MARKERS: &[&str] = &["logo", "client", "customer", "partner"];

/// Phrases that mark a heading or title as a customer story
const STORY_MARKERS: &[&str] = &["case study", "success story", "customer story"];

/// Separators between a customer name and the rest of a title
const TITLE_SEPARATORS: &[&str] = &[" | ", " - ", " – ", " — ", ": "];

/// A link found on a page
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Absolute URL
    pub url: Url,
    /// Visible anchor text, whitespace collapsed
    pub text: String,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// All followable links found on the page
    pub links: Vec<Link>,

    /// Text of h1-h4 headings in document order
    pub headings: Vec<String>,
}

/// Text of an element inside a class-marked section, with its nearest link
#[derive(Debug, Clone, PartialEq)]
pub struct SectionItem {
    pub text: String,
    pub link: Option<Url>,
}

/// Parses HTML content and extracts links, title and headings
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links
/// - Non-HTTP(S) URLs after resolution
///
/// # Errors
///
/// `ParseError::EmptyDocument` when the page has no title, links, headings
/// or body text.
///
/// # Example
///
/// ```no_run
/// use customer_scout::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Customers</title></head><body><a href="/acme">Acme</a></body></html>"#;
/// let base_url = Url::parse("https://vendor.io/").unwrap();
/// let parsed = parse_html(html, &base_url).unwrap();
/// assert_eq!(parsed.links[0].text, "Acme");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> Result<ParsedPage, ParseError> {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let links = extract_links(&document, base_url);
    let headings = extract_headings(&document);

    if title.is_none() && links.is_empty() && headings.is_empty() && !has_body_text(&document) {
        return Err(ParseError::EmptyDocument {
            url: base_url.to_string(),
        });
    }

    Ok(ParsedPage {
        title,
        links,
        headings,
    })
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<Link> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(Link {
                    url,
                    text: element_text(&element),
                });
            }
        }
    }

    links
}

fn extract_headings(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("h1, h2, h3, h4") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|h| element_text(&h))
        .filter(|t| !t.is_empty())
        .collect()
}

fn has_body_text(document: &Html) -> bool {
    Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next())
        .map(|body| body.text().any(|t| !t.trim().is_empty()))
        .unwrap_or(false)
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.set_fragment(None);
    Some(absolute_url)
}

/// Collects customer names from logo walls
///
/// Looks at `img[alt]` inside any element whose class mentions logo, client,
/// customer or partner. The words "logo" and "image" are removed from the
/// alt text; empty results and repeats are dropped.
pub fn extract_logo_names(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(img_selector) = Selector::parse("img[alt]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for section in elements_with_class(&document, LOGO_SECTION_MARKERS) {
        for img in section.select(&img_selector) {
            let alt = img.value().attr("alt").unwrap_or_default();
            let name = strip_logo_words(alt);
            if !name.is_empty() && seen.insert(name.to_lowercase()) {
                names.push(name);
            }
        }
    }

    names
}

/// Links inside class-marked sections, in document order
///
/// A bare `host.tld` href is read as an absolute `https://` link, since
/// listing pages often print domains that way. Repeated URLs are dropped.
pub fn extract_section_links(html: &str, base_url: &Url, section_markers: &[&str]) -> Vec<Link> {
    let document = Html::parse_document(html);
    let Ok(link_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for section in elements_with_class(&document, section_markers) {
        for anchor in section.select(&link_selector) {
            let href = anchor.value().attr("href").unwrap_or_default().trim();
            let url = if looks_like_bare_domain(href) {
                Url::parse(&format!("https://{}", href)).ok()
            } else {
                resolve_link(href, base_url)
            };
            let Some(url) = url else {
                continue;
            };
            if seen.insert(url.to_string()) {
                links.push(Link {
                    url,
                    text: element_text(&anchor),
                });
            }
        }
    }

    links
}

fn looks_like_bare_domain(href: &str) -> bool {
    let host = href.split('/').next().unwrap_or_default();
    !href.contains("://")
        && !href.starts_with(['/', '.', '#', '?'])
        && host.contains('.')
        && host.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// Collects items from class-marked sections
///
/// A section is any element whose class contains one of `section_markers`;
/// an item is any element inside it whose class contains one of
/// `item_markers`. Each item carries the first link inside it, or failing
/// that inside its parent. Items with repeated text are dropped.
pub fn extract_section_items(
    html: &str,
    base_url: &Url,
    section_markers: &[&str],
    item_markers: &[&str],
) -> Vec<SectionItem> {
    let document = Html::parse_document(html);
    let Ok(link_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let first_link = |element: &ElementRef| {
        element
            .select(&link_selector)
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| resolve_link(href, base_url))
    };

    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for section in elements_with_class(&document, section_markers) {
        for item in section
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| class_contains(e, item_markers))
        {
            let text = element_text(&item);
            if text.is_empty() || !seen.insert(text.to_lowercase()) {
                continue;
            }

            let link = first_link(&item).or_else(|| {
                item.parent()
                    .and_then(ElementRef::wrap)
                    .and_then(|parent| first_link(&parent))
            });

            items.push(SectionItem { text, link });
        }
    }

    items
}

/// Customer name from a story heading or title, e.g. "Acme Corp Case Study"
///
/// Returns None unless the text mentions a case study, success story or
/// customer story.
pub fn story_customer_name(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    if !STORY_MARKERS.iter().any(|m| lower.contains(m)) {
        return None;
    }

    let name = strip_story_words(&first_title_part(text));
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Leading segment of a page title, with story wording removed
///
/// "Globex | Customer Story | Vendor" becomes "Globex".
pub fn title_customer_name(title: &str) -> Option<String> {
    let name = strip_story_words(&first_title_part(title));
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn first_title_part(text: &str) -> String {
    let cut = TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| text.find(sep))
        .min()
        .unwrap_or(text.len());
    text[..cut].trim().to_string()
}

fn strip_story_words(text: &str) -> String {
    let mut result = text.to_string();
    for marker in STORY_MARKERS {
        if let Some(idx) = result.to_ascii_lowercase().find(marker) {
            result.replace_range(idx..idx + marker.len(), " ");
        }
    }
    collapse_whitespace(&result)
        .trim_matches(|c: char| c.is_ascii_punctuation() && c != '&' && c != '.')
        .trim()
        .to_string()
}

fn strip_logo_words(alt: &str) -> String {
    alt.split_whitespace()
        .filter(|w| {
            let w = w.to_lowercase();
            w != "logo" && w != "image"
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// All elements whose class attribute contains any of `markers`
fn elements_with_class<'a>(document: &'a Html, markers: &[&str]) -> Vec<ElementRef<'a>> {
    let Ok(selector) = Selector::parse("[class]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|e| class_contains(e, markers))
        .collect()
}

fn class_contains(element: &ElementRef, markers: &[&str]) -> bool {
    element
        .value()
        .attr("class")
        .map(|class| {
            let class = class.to_lowercase();
            markers.iter().any(|m| class.contains(m))
        })
        .unwrap_or(false)
}

fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://vendor.io/customers").unwrap()
    }

    #[test]
    fn test_extract_title() {
        let html = r#"<html><head><title>  Our   Customers </title></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.title, Some("Our Customers".to_string()));
    }

    #[test]
    fn test_empty_document_is_parse_error() {
        let result = parse_html("<html><head></head><body>  </body></html>", &base_url());
        assert!(matches!(result, Err(ParseError::EmptyDocument { .. })));
    }

    #[test]
    fn test_body_text_alone_is_enough() {
        let parsed = parse_html("<html><body>Hello</body></html>", &base_url()).unwrap();
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_links_carry_text_and_resolve() {
        let html = r#"<html><body>
            <a href="/customers/acme">  Acme
               Corp </a>
            <a href="https://globex.com/#top">Globex</a>
        </body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.links.len(), 2);
        assert_eq!(parsed.links[0].url.as_str(), "https://vendor.io/customers/acme");
        assert_eq!(parsed.links[0].text, "Acme Corp");
        assert_eq!(parsed.links[1].url.as_str(), "https://globex.com/");
    }

    #[test]
    fn test_skip_special_links() {
        let html = r##"<html><body>
            <a href="javascript:void(0)">js</a>
            <a href="MAILTO:x@vendor.io">mail</a>
            <a href="tel:+1234">tel</a>
            <a href="data:text/html,hi">data</a>
            <a href="#section">jump</a>
            <a href="/file.pdf" download>file</a>
            <a href="ftp://vendor.io/x">ftp</a>
            <a href="/ok">ok</a>
        </body></html>"##;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.links.len(), 1);
        assert_eq!(parsed.links[0].text, "ok");
    }

    #[test]
    fn test_headings() {
        let html = r#"<html><body><h1>Customers</h1><h3>Acme Case Study</h3><h5>skip</h5></body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.headings, vec!["Customers", "Acme Case Study"]);
    }

    #[test]
    fn test_extract_logo_names() {
        let html = r#"<html><body>
            <div class="customer-logos">
                <img alt="Acme logo" src="a.png">
                <img alt="Globex" src="g.png">
                <img alt="acme LOGO" src="a2.png">
                <img alt="logo" src="x.png">
            </div>
            <div class="hero"><img alt="Hero image" src="h.png"></div>
        </body></html>"#;
        assert_eq!(extract_logo_names(html), vec!["Acme", "Globex"]);
    }

    #[test]
    fn test_extract_section_items() {
        let html = r#"<html><body>
            <section class="customers-list">
                <div class="card">
                    <span class="company-name">Initech</span>
                    <a href="https://initech.com">Visit</a>
                </div>
                <div class="card">
                    <span class="company-name"><a href="https://hooli.xyz/">Hooli</a></span>
                </div>
                <div class="card"><span class="company-name">Initech</span></div>
            </section>
            <span class="company-name">Outside</span>
        </body></html>"#;
        let items = extract_section_items(html, &base_url(), &["customer"], &["name"]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text, "Initech");
        assert_eq!(items[0].link.as_ref().map(|u| u.as_str()), Some("https://initech.com/"));
        assert_eq!(items[1].text, "Hooli");
        assert_eq!(items[1].link.as_ref().map(|u| u.as_str()), Some("https://hooli.xyz/"));
    }

    #[test]
    fn test_extract_section_links() {
        let html = r#"<html><body>
            <a href="https://outside.com/">Outside</a>
            <table class="results-table">
                <tr><td><a href="https://globex.com/">globex.com</a></td></tr>
                <tr><td><a href="initech.com">Initech</a></td></tr>
                <tr><td><a href="/websites/acme/?page=2">Next</a></td></tr>
                <tr><td><a href="https://globex.com/">again</a></td></tr>
            </table>
        </body></html>"#;

        let links = extract_section_links(html, &base_url(), &["results"]);
        let found: Vec<_> = links.iter().map(|l| (l.url.as_str(), l.text.as_str())).collect();
        assert_eq!(
            found,
            vec![
                ("https://globex.com/", "globex.com"),
                ("https://initech.com/", "Initech"),
                ("https://vendor.io/websites/acme/?page=2", "Next"),
            ]
        );
    }

    #[test]
    fn test_story_customer_name() {
        assert_eq!(
            story_customer_name("Acme Corp Case Study"),
            Some("Acme Corp".to_string())
        );
        assert_eq!(
            story_customer_name("Globex - Success Story | Vendor"),
            Some("Globex".to_string())
        );
        assert_eq!(story_customer_name("Pricing plans"), None);
        assert_eq!(story_customer_name("Case Study"), None);
    }

    #[test]
    fn test_title_customer_name() {
        assert_eq!(
            title_customer_name("Initech | Customer Story | Vendor"),
            Some("Initech".to_string())
        );
        assert_eq!(title_customer_name("Hooli"), Some("Hooli".to_string()));
        assert_eq!(title_customer_name(" | Vendor"), None);
    }
}
