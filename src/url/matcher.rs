/// Checks if a domain matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "linkedin.com" matches only "linkedin.com"
/// 2. Wildcard match: "*.linkedin.com" matches the bare domain and any subdomain
///
/// Both sides are compared case-insensitively.
///
/// # Examples
///
/// ```
/// use customer_scout::url::matches_wildcard;
///
/// assert!(matches_wildcard("linkedin.com", "LinkedIn.com"));
/// assert!(matches_wildcard("*.linkedin.com", "linkedin.com"));
/// assert!(matches_wildcard("*.linkedin.com", "uk.linkedin.com"));
/// assert!(!matches_wildcard("*.linkedin.com", "notlinkedin.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let candidate = candidate.to_lowercase();

    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// True when the domain matches any of the patterns
pub fn matches_any(patterns: &[String], candidate: &str) -> bool {
    patterns.iter().any(|p| matches_wildcard(p, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("acme.io", "acme.io"));
        assert!(!matches_wildcard("acme.io", "blog.acme.io"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_nested() {
        assert!(matches_wildcard("*.facebook.com", "facebook.com"));
        assert!(matches_wildcard("*.facebook.com", "m.facebook.com"));
        assert!(matches_wildcard("*.facebook.com", "a.b.facebook.com"));
    }

    #[test]
    fn test_wildcard_no_partial_match() {
        assert!(!matches_wildcard("*.x.com", "box.com"));
        assert!(!matches_wildcard("*.x.com", "x.com.evil.io"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches_wildcard("*.YouTube.com", "www.youtube.COM"));
    }

    #[test]
    fn test_matches_any() {
        let patterns = vec!["*.linkedin.com".to_string(), "wikipedia.org".to_string()];
        assert!(matches_any(&patterns, "www.linkedin.com"));
        assert!(matches_any(&patterns, "wikipedia.org"));
        assert!(!matches_any(&patterns, "en.wikipedia.org"));
        assert!(!matches_any(&[], "acme.io"));
    }
}
