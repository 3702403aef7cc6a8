use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use customer_scout::config::load_config;
///
/// let config = load_config(Path::new("scout.toml")).unwrap();
/// println!("Minimum valid records: {}", config.validation.min_valid_records);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so job reports can be traced back to the exact settings used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NameStrictness;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[fetcher]
request-timeout-ms = 4000
max-connections = 6

[coordinator]
workers = 8
batch-size = 20
batch-delay-ms = 250

[validation]
min-valid-records = 5
name-strictness = "high"

[subdomain]
enabled = true
index-url = "https://customers.{vendor}.io/"
page-pattern = "https://customers.{vendor}.io/story/{slug}"
seed-slugs = ["acme", "globex"]

[[review-site]]
name = "peerspot"
search-url = "https://www.peerspot.com/search?search={vendor}&page=1"

[[tech-lookup]]
name = "publicwww"
lookup-url = "https://publicwww.com/websites/{vendor}/"
section-markers = ["results"]

[[tech-lookup]]
name = "builtwith"
lookup-url = "https://builtwith.com/{vendor}"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.fetcher.request_timeout_ms, 4000);
        assert_eq!(config.fetcher.max_connections, 6);
        assert_eq!(config.coordinator.workers, 8);
        assert_eq!(config.coordinator.batch_size, 20);
        assert_eq!(config.validation.min_valid_records, 5);
        assert_eq!(config.validation.name_strictness, NameStrictness::High);
        assert_eq!(config.subdomain.seed_slugs.len(), 2);
        assert_eq!(config.review_sites.len(), 1);
        assert_eq!(config.review_sites[0].profile_markers, vec!["/products/"]);
        assert_eq!(config.tech_lookups.len(), 2);
        assert_eq!(config.tech_lookups[0].section_markers, vec!["results"]);
        assert!(config.tech_lookups[1]
            .section_markers
            .contains(&"used-by".to_string()));
        // Untouched sections keep their defaults
        assert!(config.vendor_site.enabled);
        assert_eq!(config.jobs.log_capacity, 50);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.coordinator.workers, 5);
        assert_eq!(config.validation.min_valid_records, 3);
        assert_eq!(config.jobs.job_timeout_secs, None);
        assert!(!config.subdomain.enabled);
        assert_eq!(config.enabled_source_count(), 3);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/scout.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[coordinator]
workers = 0
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("[coordinator]\nworkers = 4\n");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_load_config_with_hash() {
        let file1 = create_temp_config("[coordinator]\nworkers = 4\n");
        let file2 = create_temp_config("[coordinator]\nworkers = 6\n");

        let (config, hash1) = load_config_with_hash(file1.path()).unwrap();
        let (_, hash2) = load_config_with_hash(file2.path()).unwrap();

        assert_eq!(config.coordinator.workers, 4);
        assert_ne!(hash1, hash2);
    }
}
