use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "ref",
    "source",
];

/// Normalizes a scraped URL into a canonical absolute form
///
/// # Normalization Steps
///
/// 1. Trim whitespace; prefix `https://` when no scheme is present
/// 2. Parse the URL; reject if malformed or not HTTP(S)
/// 3. Lowercase the host and remove a `www.` prefix
/// 4. Normalize path (dot segments, duplicate and trailing slashes)
/// 5. Remove the fragment
/// 6. Remove tracking query parameters and sort the rest
///
/// Path case is preserved here; [`dedup_key`] folds it.
///
/// # Examples
///
/// ```
/// use customer_scout::url::normalize_url;
///
/// let url = normalize_url("WWW.Acme.io/Customers/").unwrap();
/// assert_eq!(url.as_str(), "https://acme.io/Customers");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches("//"))
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() {
        return Err(UrlError::MissingDomain);
    }
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let filtered_params = filter_and_sort_query_params(&url);

        if filtered_params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = filtered_params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    Ok(url)
}

/// Computes the key two records are deduplicated on
///
/// With a URL present, the key is the normalized URL without its scheme,
/// lowercased in full: hosts *and paths* compare case-insensitively, so
/// `Example.com/a` and `example.com/A` collapse to one customer. A URL
/// that cannot be normalized falls back to its trimmed lowercase text.
/// Without a URL the key is the lowercase name with whitespace collapsed.
///
/// # Examples
///
/// ```
/// use customer_scout::url::dedup_key;
///
/// assert_eq!(dedup_key(Some("Example.com/a"), "Acme"), dedup_key(Some("example.com/A"), "ACME"));
/// assert_eq!(dedup_key(None, "  Acme   Corp "), "acme corp");
/// ```
pub fn dedup_key(url: Option<&str>, name: &str) -> String {
    match url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(raw) => match normalize_url(raw) {
            Ok(normalized) => {
                let mut key = normalized.host_str().unwrap_or_default().to_string();
                if let Some(port) = normalized.port() {
                    key.push_str(&format!(":{}", port));
                }
                let path = normalized.path();
                if path != "/" {
                    key.push_str(path);
                }
                if let Some(query) = normalized.query() {
                    key.push('?');
                    key.push_str(query);
                }
                key.to_lowercase()
            }
            Err(_) => raw.trim_end_matches('/').to_lowercase(),
        },
        None => name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
    }
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
