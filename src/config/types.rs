use serde::Deserialize;

/// Main configuration structure for Customer Scout
///
/// Every section has defaults, so an empty file is a usable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default, rename = "vendor-site")]
    pub vendor_site: VendorSiteConfig,
    #[serde(default, rename = "featured-customers")]
    pub featured_customers: FeaturedCustomersConfig,
    #[serde(default, rename = "search-engine")]
    pub search_engine: SearchEngineConfig,
    #[serde(default)]
    pub subdomain: SubdomainConfig,
    #[serde(default, rename = "review-site")]
    pub review_sites: Vec<ReviewSiteEntry>,
    #[serde(default, rename = "tech-lookup")]
    pub tech_lookups: Vec<TechLookupEntry>,
}

impl Config {
    /// Number of sources that will run for each job
    pub fn enabled_source_count(&self) -> usize {
        [
            self.vendor_site.enabled,
            self.featured_customers.enabled,
            self.search_engine.enabled,
            self.subdomain.enabled,
        ]
        .iter()
        .filter(|enabled| **enabled)
        .count()
            + self.review_sites.len()
            + self.tech_lookups.len()
    }
}

/// HTTP fetching and DNS limits
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Upper bound on a single HTTP request (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Upper bound on a single DNS lookup (milliseconds)
    #[serde(rename = "dns-timeout-ms", default = "default_dns_timeout_ms")]
    pub dns_timeout_ms: u64,

    /// Simultaneous outbound HTTP connections across all jobs
    #[serde(rename = "max-connections", default = "default_max_connections")]
    pub max_connections: u32,

    /// Global request rate
    #[serde(rename = "requests-per-second", default = "default_requests_per_second")]
    pub requests_per_second: u32,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            dns_timeout_ms: default_dns_timeout_ms(),
            max_connections: default_max_connections(),
            requests_per_second: default_requests_per_second(),
            user_agent: default_user_agent(),
        }
    }
}

/// Worker pool behavior for per-page tasks
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    /// Maximum tasks in flight at once within one source
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Tasks submitted per batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Pause between batches (milliseconds)
    #[serde(rename = "batch-delay-ms", default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Emit a heartbeat progress event every N completed tasks
    #[serde(rename = "progress-every", default = "default_progress_every")]
    pub progress_every: u32,

    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            progress_every: default_progress_every(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// How strictly candidate names are screened before validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameStrictness {
    Low,
    #[default]
    Medium,
    High,
}

/// Validation and gate settings
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Structurally valid records required to pass the gate
    #[serde(rename = "min-valid-records", default = "default_min_valid_records")]
    pub min_valid_records: usize,

    #[serde(rename = "check-dns", default = "default_true")]
    pub check_dns: bool,

    #[serde(rename = "dns-cache-ttl-secs", default = "default_dns_cache_ttl_secs")]
    pub dns_cache_ttl_secs: u64,

    #[serde(rename = "name-strictness", default)]
    pub name_strictness: NameStrictness,

    /// Domain patterns never accepted as customer URLs (e.g. "*.linkedin.com")
    #[serde(rename = "excluded-domains", default = "default_excluded_domains")]
    pub excluded_domains: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_valid_records: default_min_valid_records(),
            check_dns: true,
            dns_cache_ttl_secs: default_dns_cache_ttl_secs(),
            name_strictness: NameStrictness::default(),
            excluded_domains: default_excluded_domains(),
        }
    }
}

/// Job lifecycle settings
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(rename = "default-max-results", default = "default_max_results")]
    pub default_max_results: usize,

    /// Wall-clock bound for a whole job; unset means unbounded
    #[serde(rename = "job-timeout-secs", default)]
    pub job_timeout_secs: Option<u64>,

    /// Reuse a running job for the same vendor and limit instead of starting another
    #[serde(rename = "dedupe-concurrent-jobs", default)]
    pub dedupe_concurrent_jobs: bool,

    /// How long finished jobs are kept before cleanup
    #[serde(rename = "retention-secs", default = "default_retention_secs")]
    pub retention_secs: u64,

    #[serde(rename = "log-capacity", default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            default_max_results: default_max_results(),
            job_timeout_secs: None,
            dedupe_concurrent_jobs: false,
            retention_secs: default_retention_secs(),
            log_capacity: default_log_capacity(),
        }
    }
}

/// The vendor's own website
#[derive(Debug, Clone, Deserialize)]
pub struct VendorSiteConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Homepage guess; `{vendor}` is replaced by the vendor slug
    #[serde(rename = "domain-template", default = "default_domain_template")]
    pub domain_template: String,

    /// Path fragments that mark a customer page
    #[serde(rename = "customer-keywords", default = "default_customer_keywords")]
    pub customer_keywords: Vec<String>,

    /// Paths always tried relative to the homepage
    #[serde(rename = "customer-paths", default = "default_customer_paths")]
    pub customer_paths: Vec<String>,
}

impl Default for VendorSiteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            domain_template: default_domain_template(),
            customer_keywords: default_customer_keywords(),
            customer_paths: default_customer_paths(),
        }
    }
}

/// The FeaturedCustomers directory
#[derive(Debug, Clone, Deserialize)]
pub struct FeaturedCustomersConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(rename = "base-url", default = "default_featured_customers_url")]
    pub base_url: String,
}

impl Default for FeaturedCustomersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_featured_customers_url(),
        }
    }
}

/// Templated web search queries
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEngineConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HTML search endpoint; `{query}` is replaced by the encoded query
    #[serde(rename = "search-url", default = "default_search_url")]
    pub search_url: String,

    /// Query templates; `{vendor}` is replaced by the vendor name
    #[serde(default = "default_queries")]
    pub queries: Vec<String>,
}

impl Default for SearchEngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_url: default_search_url(),
            queries: default_queries(),
        }
    }
}

/// Enumerated customer pages under a fixed URL pattern
#[derive(Debug, Clone, Deserialize)]
pub struct SubdomainConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Index page listing customer pages; `{vendor}` is replaced by the vendor slug
    #[serde(rename = "index-url", default = "default_index_url")]
    pub index_url: String,

    /// Customer page pattern; must contain `{slug}`
    #[serde(rename = "page-pattern", default = "default_page_pattern")]
    pub page_pattern: String,

    /// Slugs always checked, in addition to those linked from the index
    #[serde(rename = "seed-slugs", default)]
    pub seed_slugs: Vec<String>,
}

impl Default for SubdomainConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            index_url: default_index_url(),
            page_pattern: default_page_pattern(),
            seed_slugs: Vec::new(),
        }
    }
}

/// A review site searched for the vendor's product page
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewSiteEntry {
    pub name: String,

    /// Search page; `{vendor}` is replaced by the encoded vendor name
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// Path fragments identifying product profile links
    #[serde(rename = "profile-markers", default = "default_profile_markers")]
    pub profile_markers: Vec<String>,
}

/// A technology-usage index (BuiltWith, PublicWWW and the like) listing
/// sites that embed the vendor's product
#[derive(Debug, Clone, Deserialize)]
pub struct TechLookupEntry {
    pub name: String,

    /// Listing page; `{vendor}` is replaced by the encoded vendor name
    #[serde(rename = "lookup-url")]
    pub lookup_url: String,

    /// Class fragments marking the sections that hold site links
    #[serde(rename = "section-markers", default = "default_section_markers")]
    pub section_markers: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_dns_timeout_ms() -> u64 {
    3_000
}

fn default_max_connections() -> u32 {
    8
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_user_agent() -> String {
    format!("CustomerScout/{}", env!("CARGO_PKG_VERSION"))
}

fn default_workers() -> u32 {
    5
}

fn default_batch_size() -> u32 {
    10
}

fn default_batch_delay_ms() -> u64 {
    500
}

fn default_progress_every() -> u32 {
    5
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_min_valid_records() -> usize {
    3
}

fn default_dns_cache_ttl_secs() -> u64 {
    3_600
}

fn default_excluded_domains() -> Vec<String> {
    [
        "*.linkedin.com",
        "*.twitter.com",
        "*.x.com",
        "*.facebook.com",
        "*.youtube.com",
        "*.instagram.com",
        "*.google.com",
        "*.wikipedia.org",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_results() -> usize {
    20
}

fn default_retention_secs() -> u64 {
    3_600
}

fn default_log_capacity() -> usize {
    50
}

fn default_domain_template() -> String {
    "https://www.{vendor}.com".to_string()
}

fn default_customer_keywords() -> Vec<String> {
    [
        "customers",
        "case-studies",
        "success-stories",
        "clients",
        "testimonials",
        "reviews",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_customer_paths() -> Vec<String> {
    vec!["/customers".to_string(), "/case-studies".to_string()]
}

fn default_featured_customers_url() -> String {
    "https://www.featuredcustomers.com".to_string()
}

fn default_search_url() -> String {
    "https://html.duckduckgo.com/html/?q={query}".to_string()
}

fn default_queries() -> Vec<String> {
    [
        "\"{vendor}\" customers",
        "\"has chosen {vendor}\"",
        "\"{vendor}\" case study",
        "\"{vendor}\" success story",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_index_url() -> String {
    "https://{vendor}.com/customers".to_string()
}

fn default_page_pattern() -> String {
    "https://{vendor}.com/customers/{slug}".to_string()
}

fn default_profile_markers() -> Vec<String> {
    vec!["/products/".to_string()]
}

fn default_section_markers() -> Vec<String> {
    ["used-by", "customer", "client", "results", "site-list"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}
