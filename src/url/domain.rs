use url::Url;

/// Extracts the lowercase host from a parsed URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use customer_scout::url::extract_domain;
///
/// let url = Url::parse("https://Customers.Acme.io/story").unwrap();
/// assert_eq!(extract_domain(&url), Some("customers.acme.io".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Reduces loosely written URL text to a bare domain
///
/// Scraped URLs arrive in every shape (`https://www.Acme.io/about`,
/// `acme.io`, `//acme.io:8080`). The scheme, `www.`, port, path, query
/// and fragment are dropped, whitespace is removed and the result is
/// lowercased. Returns `None` when nothing host-like remains.
///
/// # Examples
///
/// ```
/// use customer_scout::url::clean_domain;
///
/// assert_eq!(clean_domain("https://www.Acme.io/about?x=1"), Some("acme.io".to_string()));
/// assert_eq!(clean_domain("  globex .com "), Some("globex.com".to_string()));
/// assert_eq!(clean_domain("https://"), None);
/// ```
pub fn clean_domain(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let lower = compact.to_lowercase();

    let without_scheme = match lower.find("://") {
        Some(idx) => &lower[idx + 3..],
        None => lower.trim_start_matches("//"),
    };

    let netloc = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = netloc.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);

    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Slug used to guess vendor domains: lowercase with whitespace removed
///
/// # Examples
///
/// ```
/// use customer_scout::url::vendor_slug;
///
/// assert_eq!(vendor_slug("Acme Analytics"), "acmeanalytics");
/// ```
pub fn vendor_slug(vendor_name: &str) -> String {
    vendor_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// True when `domain` belongs to the vendor itself (e.g. `blog.acme.com` for "Acme")
pub fn is_vendor_domain(domain: &str, vendor_name: &str) -> bool {
    let slug = vendor_slug(vendor_name);
    !slug.is_empty() && domain.to_lowercase().contains(&slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain_lowercases() {
        let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_domain_with_port() {
        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_clean_domain_variants() {
        assert_eq!(clean_domain("acme.io"), Some("acme.io".to_string()));
        assert_eq!(clean_domain("http://acme.io"), Some("acme.io".to_string()));
        assert_eq!(
            clean_domain("HTTPS://WWW.ACME.IO/Customers/"),
            Some("acme.io".to_string())
        );
        assert_eq!(clean_domain("//acme.io:8443/x"), Some("acme.io".to_string()));
        assert_eq!(clean_domain("acme.io#top"), Some("acme.io".to_string()));
        assert_eq!(clean_domain("user@acme.io"), Some("acme.io".to_string()));
    }

    #[test]
    fn test_clean_domain_empty() {
        assert_eq!(clean_domain(""), None);
        assert_eq!(clean_domain("   "), None);
        assert_eq!(clean_domain("https:///path"), None);
    }

    #[test]
    fn test_vendor_slug() {
        assert_eq!(vendor_slug("Salesforce"), "salesforce");
        assert_eq!(vendor_slug(" Big  Data Co "), "bigdataco");
    }

    #[test]
    fn test_is_vendor_domain() {
        assert!(is_vendor_domain("blog.acme.com", "Acme"));
        assert!(is_vendor_domain("acmeanalytics.io", "Acme Analytics"));
        assert!(!is_vendor_domain("globex.com", "Acme"));
        assert!(!is_vendor_domain("globex.com", "   "));
    }
}
