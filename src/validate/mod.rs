//! Candidate validation and the data-quality gate
//!
//! Validation runs in three steps:
//! 1. Name screening drops obvious non-companies (vendor's own name, logo
//!    alt text, content titles) according to the configured strictness.
//! 2. The structural check reduces the candidate URL to a bare domain and
//!    rejects placeholders, malformed hosts and excluded domains.
//! 3. Structurally valid domains are resolved through a [`DnsResolver`].
//!
//! The [`ValidationGate`] then decides whether enough structurally valid
//! records exist for the job to continue.

mod dns;

pub use dns::{DnsResolver, StaticResolver, TokioDnsResolver};

use crate::config::{NameStrictness, ValidationConfig};
use crate::state::{
    CandidateRecord, GroupState, GroupValidation, SourceKind, ValidatedRecord, ValidationGroup,
    ValidationStatus, ValidationSummary,
};
use crate::url::{clean_domain, matches_any};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Domains that show up in scraped markup but never belong to a customer
const PLACEHOLDER_DOMAINS: &[&str] = &[
    "example.com",
    "localhost",
    "test.com",
    "sample.com",
    "domain.com",
    "yourdomain.com",
    "mysite.com",
    "mydomain.com",
    "exampleurl.com",
    "testurl.com",
    "host.com",
    "placeholder.com",
];

const FORBIDDEN_CHARS: &[char] = &['<', '>', '"', '\'', '{', '}', ';', '\\'];

/// Name fragments that mark image or label text rather than a company
const LABEL_WORDS: &[&str] = &["logo", "image", "untitled", "customer", "client", "partner"];

/// Phrases that mark a content title rather than a company
const CONTENT_PHRASES: &[&str] = &[
    "case study",
    "white paper",
    "blog post",
    "article",
    "download",
    "learn more",
];

/// The gate did not pass
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", reasons.join("; "))]
pub struct ValidationError {
    /// Itemized reasons, most important first
    pub reasons: Vec<String>,
}

/// Counts of rejections by reason, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionTally {
    counts: Vec<(String, usize)>,
}

impl RejectionTally {
    pub fn add(&mut self, reason: &str) {
        match self.counts.iter_mut().find(|(r, _)| r == reason) {
            Some((_, n)) => *n += 1,
            None => self.counts.push((reason.to_string(), 1)),
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `"<reason> (N items)"` lines
    pub fn reasons(&self) -> Vec<String> {
        self.counts
            .iter()
            .map(|(reason, n)| format!("{} ({} items)", reason, n))
            .collect()
    }
}

/// Runs name screening, structural checks and DNS checks
pub struct Validator {
    resolver: Option<Arc<dyn DnsResolver>>,
    excluded_domains: Vec<String>,
    strictness: NameStrictness,
    concurrency: usize,
}

impl Validator {
    /// `resolver` of `None` skips DNS; every record then has `dns_valid == false`
    pub fn new(
        config: &ValidationConfig,
        resolver: Option<Arc<dyn DnsResolver>>,
        concurrency: usize,
    ) -> Self {
        Self {
            resolver,
            excluded_domains: config.excluded_domains.clone(),
            strictness: config.name_strictness,
            concurrency: concurrency.max(1),
        }
    }

    /// Why `candidate` is not a plausible customer of `vendor_name`, if it isn't
    pub fn screen_name(&self, vendor_name: &str, candidate: &CandidateRecord) -> Result<(), &'static str> {
        let name = candidate.raw_name.trim();
        let lower = name.to_lowercase();
        let min_len = match self.strictness {
            NameStrictness::Low => 2,
            NameStrictness::Medium | NameStrictness::High => 3,
        };

        if name.chars().count() < min_len {
            return Err("Customer name too short");
        }
        if lower == vendor_name.trim().to_lowercase() {
            return Err("Customer name same as vendor name");
        }
        if self.strictness != NameStrictness::Low {
            if LABEL_WORDS.iter().any(|w| lower.contains(w)) {
                return Err("Customer name contains invalid pattern");
            }
            if CONTENT_PHRASES.iter().any(|p| lower.contains(p)) {
                return Err("Customer name appears to be content, not a company");
            }
        }
        if self.strictness == NameStrictness::High && candidate.raw_url.is_none() {
            return Err("Missing URL for customer");
        }
        Ok(())
    }

    /// Splits candidates into those that pass name screening and a tally of the rest
    pub fn screen(
        &self,
        vendor_name: &str,
        candidates: Vec<CandidateRecord>,
    ) -> (Vec<CandidateRecord>, RejectionTally) {
        let mut tally = RejectionTally::default();
        let kept = candidates
            .into_iter()
            .filter(|c| match self.screen_name(vendor_name, c) {
                Ok(()) => true,
                Err(reason) => {
                    tracing::debug!("Screened out {:?}: {}", c.raw_name, reason);
                    tally.add(reason);
                    false
                }
            })
            .collect();
        (kept, tally)
    }

    /// Reduces a raw URL to a bare domain, or says why it can't be one
    pub fn check_structure(&self, raw_url: &str) -> Result<String, &'static str> {
        if raw_url.contains(FORBIDDEN_CHARS) {
            return Err("URL contains invalid characters");
        }
        let domain = clean_domain(raw_url).ok_or("URL has no domain")?;

        if domain.contains("..") {
            return Err("URL contains invalid characters");
        }
        if PLACEHOLDER_DOMAINS.contains(&domain.as_str()) {
            return Err("URL is a placeholder domain");
        }
        if domain.len() < 4 || !domain.contains('.') {
            return Err("URL too short or missing domain extension");
        }

        let tld = domain.rsplit('.').next().unwrap_or_default();
        if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err("Invalid top-level domain");
        }
        if domain.split('.').next().map_or(true, str::is_empty) {
            return Err("Invalid domain name");
        }
        if matches_any(&self.excluded_domains, &domain) {
            return Err("URL is an excluded domain");
        }

        Ok(domain)
    }

    /// Structural check followed by DNS resolution
    pub async fn validate(&self, candidate: CandidateRecord) -> ValidatedRecord {
        let structure = match candidate.raw_url.as_deref() {
            Some(raw) => self.check_structure(raw),
            None => Err("Missing URL"),
        };

        match structure {
            Ok(domain) => {
                let dns_valid = match &self.resolver {
                    Some(resolver) => resolver.resolves(&domain).await,
                    None => false,
                };
                let validation_status = if dns_valid || self.resolver.is_none() {
                    ValidationStatus::Valid
                } else {
                    ValidationStatus::Invalid
                };
                ValidatedRecord {
                    candidate,
                    domain: Some(domain),
                    structure_valid: true,
                    dns_valid,
                    validation_status,
                    rejection: None,
                }
            }
            Err(reason) => ValidatedRecord {
                candidate,
                domain: None,
                structure_valid: false,
                dns_valid: false,
                validation_status: ValidationStatus::Invalid,
                rejection: Some(reason.to_string()),
            },
        }
    }

    /// Validates every candidate, at most `concurrency` lookups at a time
    ///
    /// Output order matches input order.
    pub async fn validate_all(&self, candidates: Vec<CandidateRecord>) -> Vec<ValidatedRecord> {
        stream::iter(candidates)
            .map(|c| self.validate(c))
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Minimum-data checkpoint between validation and aggregation
#[derive(Debug, Clone, Copy)]
pub struct ValidationGate {
    min_valid_records: usize,
}

impl ValidationGate {
    pub fn new(min_valid_records: usize) -> Self {
        Self { min_valid_records }
    }

    /// Number of distinct structurally valid customers, or the reasons there
    /// are too few
    ///
    /// Reasons list the shortfall first, then name-screening tallies, then
    /// structural rejections.
    pub fn check(
        &self,
        records: &[ValidatedRecord],
        screened: &RejectionTally,
    ) -> Result<usize, ValidationError> {
        let valid = unique_valid_count(records);
        if valid >= self.min_valid_records {
            return Ok(valid);
        }

        let mut structural = RejectionTally::default();
        for reason in records.iter().filter_map(|r| r.rejection.as_deref()) {
            structural.add(reason);
        }

        let mut reasons = vec![format!(
            "Insufficient structurally valid records: {}/{} required",
            valid, self.min_valid_records
        )];
        reasons.extend(screened.reasons());
        reasons.extend(structural.reasons());

        Err(ValidationError { reasons })
    }
}

/// Distinct customers among the structurally valid records
pub fn unique_valid_count(records: &[ValidatedRecord]) -> usize {
    records
        .iter()
        .filter(|r| r.structure_valid)
        .map(ValidatedRecord::dedup_key)
        .collect::<HashSet<_>>()
        .len()
}

/// Per-bucket validation state for the status payload
///
/// `outcomes` lists every source that ran and whether it succeeded.
/// `combined` is left pending for the gate to fill in.
pub fn group_summary(records: &[ValidatedRecord], outcomes: &[(SourceKind, bool)]) -> ValidationSummary {
    let mut summary = ValidationSummary::default();

    for group in ValidationGroup::all() {
        let ran: Vec<bool> = outcomes
            .iter()
            .filter(|(kind, _)| kind.validation_group() == group)
            .map(|(_, ok)| *ok)
            .collect();
        let count = records
            .iter()
            .filter(|r| r.structure_valid && r.candidate.source.validation_group() == group)
            .count();

        let status = if ran.is_empty() {
            GroupState::Skipped
        } else if count > 0 {
            GroupState::Passed
        } else if ran.iter().all(|ok| !ok) {
            GroupState::Failed
        } else {
            GroupState::Empty
        };
        *summary.group_mut(group) = GroupValidation::new(status, count);
    }

    summary
}
