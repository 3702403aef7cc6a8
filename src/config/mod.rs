//! Configuration module for Customer Scout
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use customer_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scout.toml")).unwrap();
//! println!("Workers per source: {}", config.coordinator.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CoordinatorConfig, FeaturedCustomersConfig, FetcherConfig, JobsConfig,
    NameStrictness, ReviewSiteEntry, SearchEngineConfig, SubdomainConfig, TechLookupEntry,
    ValidationConfig, VendorSiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
