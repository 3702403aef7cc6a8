//! Per-job counters and validation summary
//!
//! Counters only ever grow. They are written by the job's status aggregator
//! alone and copied out for readers.

use crate::state::records::ValidationGroup;
use serde::Serialize;

/// Progress counters for one job
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobMetrics {
    /// Units of work (pages, slugs, queries) finished, successful or not
    pub pages_checked: u64,
    pub valid_pages: u64,
    pub failed_pages: u64,
    /// Candidate references returned by all units of work
    pub customer_links_found: u64,
    /// Candidates produced by sources after their own capping
    pub companies_found: u64,
    /// Entries in the aggregated result set
    pub unique_companies: u64,
    pub current_page: Option<String>,
    pub target_count: usize,
    pub elapsed_secs: f64,
    /// Progress events applied so far
    pub progress_updates: u64,
}

impl JobMetrics {
    pub fn new(target_count: usize) -> Self {
        Self {
            target_count,
            ..Self::default()
        }
    }

    pub fn record_page(&mut self, url: &str, succeeded: bool, found: usize) {
        self.pages_checked += 1;
        if succeeded {
            self.valid_pages += 1;
        } else {
            self.failed_pages += 1;
        }
        self.customer_links_found += found as u64;
        self.current_page = Some(url.to_string());
    }

    /// Raises `unique_companies`; lower values are ignored
    pub fn observe_unique(&mut self, unique: usize) {
        self.unique_companies = self.unique_companies.max(unique as u64);
    }

    /// Share of finished units that succeeded, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.pages_checked == 0 {
            0.0
        } else {
            (self.valid_pages as f64 / self.pages_checked as f64) * 100.0
        }
    }
}

/// State of one validation bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupState {
    #[default]
    Pending,
    /// At least one structurally valid record
    Passed,
    /// Source ran but yielded nothing valid
    Empty,
    /// Every source in the bucket errored, or the combined gate failed
    Failed,
    /// No source in the bucket is enabled
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupValidation {
    pub status: GroupState,
    pub count: usize,
}

impl GroupValidation {
    pub fn new(status: GroupState, count: usize) -> Self {
        Self { status, count }
    }
}

/// `validation_status` block of the job payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub vendor_site: GroupValidation,
    pub featured_customers: GroupValidation,
    pub search_engines: GroupValidation,
    pub combined: GroupValidation,
}

impl ValidationSummary {
    pub fn group_mut(&mut self, group: ValidationGroup) -> &mut GroupValidation {
        match group {
            ValidationGroup::VendorSite => &mut self.vendor_site,
            ValidationGroup::FeaturedCustomers => &mut self.featured_customers,
            ValidationGroup::SearchEngines => &mut self.search_engines,
        }
    }

    pub fn group(&self, group: ValidationGroup) -> GroupValidation {
        match group {
            ValidationGroup::VendorSite => self.vendor_site,
            ValidationGroup::FeaturedCustomers => self.featured_customers,
            ValidationGroup::SearchEngines => self.search_engines,
        }
    }
}
