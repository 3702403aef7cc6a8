//! Records flowing through the pipeline: candidates, validated records and results

use crate::url::dedup_key;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Which kind of source produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    VendorSite,
    FeaturedCustomers,
    SearchEngine,
    SubdomainEnumeration,
    ReviewSite,
    TechLookup,
}

impl SourceKind {
    /// The status-payload validation bucket this source reports into
    pub fn validation_group(&self) -> ValidationGroup {
        match self {
            Self::VendorSite | Self::SubdomainEnumeration => ValidationGroup::VendorSite,
            Self::FeaturedCustomers | Self::ReviewSite | Self::TechLookup => {
                ValidationGroup::FeaturedCustomers
            }
            Self::SearchEngine => ValidationGroup::SearchEngines,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VendorSite => "vendor_site",
            Self::FeaturedCustomers => "featured_customers",
            Self::SearchEngine => "search_engine",
            Self::SubdomainEnumeration => "subdomain_enumeration",
            Self::ReviewSite => "review_site",
            Self::TechLookup => "tech_lookup",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Buckets reported under `validation_status` in the job payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationGroup {
    VendorSite,
    FeaturedCustomers,
    SearchEngines,
}

impl ValidationGroup {
    pub fn all() -> [ValidationGroup; 3] {
        [Self::VendorSite, Self::FeaturedCustomers, Self::SearchEngines]
    }
}

/// Deterministic position of a candidate in discovery order
///
/// `source_rank` is the source's position in the job's source list, `task`
/// the submission index of the unit of work that found it and `item` its
/// position within that unit. Ordering by this value is independent of
/// which task happened to finish first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DiscoveryOrder {
    pub source_rank: u16,
    pub task: u32,
    pub item: u32,
}

/// An unverified customer reference scraped from some source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRecord {
    pub source: SourceKind,
    pub source_name: String,
    pub raw_name: String,
    pub raw_url: Option<String>,
    pub discovered_at: DateTime<Utc>,
    pub order: DiscoveryOrder,
}

impl CandidateRecord {
    /// Creates a candidate found by unit of work `task`, at position `item`
    pub fn new(
        source: SourceKind,
        source_name: impl Into<String>,
        raw_name: impl Into<String>,
        raw_url: Option<String>,
        task: u32,
        item: u32,
    ) -> Self {
        let raw_url = raw_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        Self {
            source,
            source_name: source_name.into(),
            raw_name: raw_name.into().trim().to_string(),
            raw_url,
            discovered_at: Utc::now(),
            order: DiscoveryOrder {
                source_rank: 0,
                task,
                item,
            },
        }
    }

    /// Returns the same candidate placed at `rank` in the job's source list
    pub fn ranked(self, rank: u16) -> Self {
        Self {
            order: DiscoveryOrder {
                source_rank: rank,
                ..self.order
            },
            ..self
        }
    }

    pub fn dedup_key(&self) -> String {
        dedup_key(self.raw_url.as_deref(), &self.raw_name)
    }
}

/// Outcome of validating a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Pending,
    Valid,
    Invalid,
}

/// A candidate with its structural and DNS verdicts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRecord {
    pub candidate: CandidateRecord,
    /// Cleaned domain when the structural check passed
    pub domain: Option<String>,
    pub structure_valid: bool,
    /// Only ever true when `structure_valid` is true
    pub dns_valid: bool,
    pub validation_status: ValidationStatus,
    /// Why the structural check failed, if it did
    pub rejection: Option<String>,
}

impl ValidatedRecord {
    /// Key the result set deduplicates on
    ///
    /// Structurally valid records key on their cleaned domain, so two pages
    /// of one company collapse into a single customer.
    pub fn dedup_key(&self) -> String {
        match (&self.domain, self.structure_valid) {
            (Some(domain), true) => domain.to_lowercase(),
            _ => self.candidate.dedup_key(),
        }
    }

    /// Truncation priority: 0 = resolvable, 1 = well-formed only, 2 = invalid
    pub fn priority(&self) -> u8 {
        if self.dns_valid {
            0
        } else if self.structure_valid {
            1
        } else {
            2
        }
    }
}

/// One deduplicated customer in a job's result set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    pub competitor: String,
    pub customer_name: String,
    pub customer_url: Option<String>,
    pub source: SourceKind,
    pub validation: ValidationStatus,
    pub dns_valid: bool,
}

/// Ordered, deduplicated customers for one job
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    entries: Vec<ResultEntry>,
}

impl ResultSet {
    pub fn new(entries: Vec<ResultEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultEntry> {
        self.entries.iter()
    }
}
