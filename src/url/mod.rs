//! URL handling module for Customer Scout
//!
//! This module provides URL normalization and dedup keys, loose domain
//! cleanup, vendor slugs, wildcard domain matching and URL templates.

mod domain;
mod matcher;
mod normalize;
mod template;

// Re-export main functions
pub use domain::{clean_domain, extract_domain, is_vendor_domain, vendor_slug};
pub use matcher::{matches_any, matches_wildcard};
pub use normalize::{dedup_key, normalize_url};
pub use template::{encode_query, fill_template};

use url::Url;

/// True when `link` points to a different host than `page`
///
/// `www.` prefixes are ignored, so `www.acme.io` and `acme.io` are the same site.
pub fn is_external(link: &Url, page: &Url) -> bool {
    let strip = |u: &Url| {
        extract_domain(u).map(|d| d.strip_prefix("www.").map(str::to_string).unwrap_or(d))
    };
    match (strip(link), strip(page)) {
        (Some(a), Some(b)) => a != b,
        _ => false,
    }
}
