use crate::config::types::{
    Config, CoordinatorConfig, FetcherConfig, JobsConfig, ReviewSiteEntry, SubdomainConfig,
    TechLookupEntry, ValidationConfig,
};
use crate::ConfigError;
use url::Url;

/// Hard ceiling for a single HTTP request
const MAX_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Hard ceiling for a single DNS lookup
const MAX_DNS_TIMEOUT_MS: u64 = 5_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_coordinator_config(&config.coordinator)?;
    validate_validation_config(&config.validation)?;
    validate_jobs_config(&config.jobs)?;
    validate_sources(config)?;
    Ok(())
}

/// Validates fetcher limits
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.request_timeout_ms < 1 || config.request_timeout_ms > MAX_REQUEST_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be between 1 and {}, got {}",
            MAX_REQUEST_TIMEOUT_MS, config.request_timeout_ms
        )));
    }

    if config.dns_timeout_ms < 1 || config.dns_timeout_ms > MAX_DNS_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "dns_timeout_ms must be between 1 and {}, got {}",
            MAX_DNS_TIMEOUT_MS, config.dns_timeout_ms
        )));
    }

    if config.max_connections < 1 || config.max_connections > 64 {
        return Err(ConfigError::Validation(format!(
            "max_connections must be between 1 and 64, got {}",
            config.max_connections
        )));
    }

    if config.requests_per_second < 1 {
        return Err(ConfigError::Validation(format!(
            "requests_per_second must be >= 1, got {}",
            config.requests_per_second
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates worker pool settings
fn validate_coordinator_config(config: &CoordinatorConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 32 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 32, got {}",
            config.workers
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.progress_every < 1 {
        return Err(ConfigError::Validation(format!(
            "progress_every must be >= 1, got {}",
            config.progress_every
        )));
    }

    if config.max_retries > 5 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 5, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates validator settings
fn validate_validation_config(config: &ValidationConfig) -> Result<(), ConfigError> {
    for pattern in &config.excluded_domains {
        validate_domain_pattern(pattern)?;
    }
    Ok(())
}

/// Validates job lifecycle settings
fn validate_jobs_config(config: &JobsConfig) -> Result<(), ConfigError> {
    if config.default_max_results < 1 {
        return Err(ConfigError::Validation(format!(
            "default_max_results must be >= 1, got {}",
            config.default_max_results
        )));
    }

    if config.job_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "job_timeout_secs must be > 0 when set".to_string(),
        ));
    }

    if config.log_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "log_capacity must be >= 1, got {}",
            config.log_capacity
        )));
    }

    Ok(())
}

/// Validates the per-source settings and that at least one source runs
fn validate_sources(config: &Config) -> Result<(), ConfigError> {
    if config.enabled_source_count() == 0 {
        return Err(ConfigError::Validation(
            "at least one source must be enabled".to_string(),
        ));
    }

    if config.vendor_site.enabled {
        validate_template(
            "vendor-site.domain-template",
            &config.vendor_site.domain_template,
            "{vendor}",
        )?;
    }

    if config.featured_customers.enabled {
        Url::parse(&config.featured_customers.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid featured-customers base-url: {}", e))
        })?;
    }

    if config.search_engine.enabled {
        validate_template(
            "search-engine.search-url",
            &config.search_engine.search_url,
            "{query}",
        )?;

        if config.search_engine.queries.is_empty() {
            return Err(ConfigError::Validation(
                "search-engine.queries cannot be empty".to_string(),
            ));
        }
    }

    if config.subdomain.enabled {
        validate_subdomain_config(&config.subdomain)?;
    }

    for entry in &config.review_sites {
        validate_review_site(entry)?;
    }

    for entry in &config.tech_lookups {
        validate_tech_lookup(entry)?;
    }

    Ok(())
}

fn validate_subdomain_config(config: &SubdomainConfig) -> Result<(), ConfigError> {
    validate_template("subdomain.page-pattern", &config.page_pattern, "{slug}")?;
    validate_template("subdomain.index-url", &config.index_url, "")?;

    for slug in &config.seed_slugs {
        if slug.is_empty() || slug.contains('/') {
            return Err(ConfigError::Validation(format!(
                "Seed slug '{}' must be a single non-empty path segment",
                slug
            )));
        }
    }

    Ok(())
}

fn validate_review_site(entry: &ReviewSiteEntry) -> Result<(), ConfigError> {
    if entry.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "review-site name cannot be empty".to_string(),
        ));
    }

    validate_template(
        &format!("review-site '{}' search-url", entry.name),
        &entry.search_url,
        "{vendor}",
    )?;

    if entry.profile_markers.is_empty() {
        return Err(ConfigError::Validation(format!(
            "review-site '{}' needs at least one profile marker",
            entry.name
        )));
    }

    Ok(())
}

fn validate_tech_lookup(entry: &TechLookupEntry) -> Result<(), ConfigError> {
    if entry.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "tech-lookup name cannot be empty".to_string(),
        ));
    }

    validate_template(
        &format!("tech-lookup '{}' lookup-url", entry.name),
        &entry.lookup_url,
        "{vendor}",
    )?;

    if entry.section_markers.iter().all(|m| m.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "tech-lookup '{}' needs at least one section marker",
            entry.name
        )));
    }

    Ok(())
}

/// Checks that a URL template carries its placeholder and parses once filled in
fn validate_template(field: &str, template: &str, placeholder: &str) -> Result<(), ConfigError> {
    if !placeholder.is_empty() && !template.contains(placeholder) {
        return Err(ConfigError::Validation(format!(
            "{} must contain '{}', got '{}'",
            field, placeholder, template
        )));
    }

    let filled = template
        .replace("{vendor}", "vendor")
        .replace("{slug}", "slug")
        .replace("{query}", "query");

    let url = Url::parse(&filled)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, template
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
        || domain.contains("..")
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' has a misplaced '.' or '-'",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'linkedin.com')",
            domain
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("linkedin.com").is_ok());
        assert!(validate_domain_pattern("*.linkedin.com").is_ok());
        assert!(validate_domain_pattern("www.linkedin.com").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern("linkedin").is_err());
        assert!(validate_domain_pattern(".linkedin.com").is_err());
        assert!(validate_domain_pattern("linkedin.com.").is_err());
        assert!(validate_domain_pattern("linked..in.com").is_err());
    }

    #[test]
    fn test_request_timeout_bounded() {
        let mut config = Config::default();
        config.fetcher.request_timeout_ms = 30_001;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        config.fetcher.request_timeout_ms = 30_000;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_dns_timeout_bounded() {
        let mut config = Config::default();
        config.fetcher.dns_timeout_ms = 6_000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_no_sources_enabled() {
        let mut config = Config::default();
        config.vendor_site.enabled = false;
        config.featured_customers.enabled = false;
        config.search_engine.enabled = false;
        assert!(validate(&config).is_err());

        config.subdomain.enabled = true;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_template_placeholders_required() {
        let mut config = Config::default();
        config.search_engine.search_url = "https://search.test/?q=fixed".to_string();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.subdomain.enabled = true;
        config.subdomain.page_pattern = "https://{vendor}.com/customers".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_seed_slug_must_be_segment() {
        let mut config = Config::default();
        config.subdomain.enabled = true;
        config.subdomain.seed_slugs = vec!["acme/extra".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_review_site_validation() {
        let mut config = Config::default();
        config.review_sites.push(ReviewSiteEntry {
            name: "peerspot".to_string(),
            search_url: "https://www.peerspot.com/search?search={vendor}".to_string(),
            profile_markers: vec!["/products/".to_string()],
        });
        assert!(validate(&config).is_ok());

        config.review_sites[0].profile_markers.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_tech_lookup_validation() {
        let mut config = Config::default();
        config.tech_lookups.push(TechLookupEntry {
            name: "builtwith".to_string(),
            lookup_url: "https://builtwith.com/{vendor}".to_string(),
            section_markers: vec!["used-by".to_string()],
        });
        assert!(validate(&config).is_ok());

        config.tech_lookups[0].lookup_url = "https://builtwith.com/".to_string();
        assert!(validate(&config).is_err());

        config.tech_lookups[0].lookup_url = "https://builtwith.com/{vendor}".to_string();
        config.tech_lookups[0].section_markers = vec![" ".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_job_timeout_rejected() {
        let mut config = Config::default();
        config.jobs.job_timeout_secs = Some(0);
        assert!(validate(&config).is_err());
    }
}
