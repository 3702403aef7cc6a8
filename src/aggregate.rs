//! Aggregator and deduplicator
//!
//! Merges validated records from every source into one ordered
//! [`ResultSet`]:
//! 1. records are put in discovery order (source rank, task, item), so the
//!    outcome never depends on which task finished first
//! 2. the first record for each dedup key wins; valid records key on their
//!    cleaned domain, so every entry carries a distinct URL
//! 3. a stable priority sort moves resolvable domains ahead of well-formed
//!    ones, and those ahead of invalid ones
//! 4. the list is cut to `max_results`

use crate::state::{ResultEntry, ResultSet, ValidatedRecord};
use std::collections::HashSet;
use thiserror::Error;

/// Malformed aggregation input
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("record {name:?} from {source_name} has an empty dedup key")]
    EmptyKey { name: String, source_name: String },
}

/// Deduplicates, prioritizes and caps `records` for `competitor`
///
/// A `max_results` of zero keeps everything. Aggregating the output's
/// records again yields the same result set.
pub fn aggregate(
    competitor: &str,
    mut records: Vec<ValidatedRecord>,
    max_results: usize,
) -> Result<ResultSet, AggregationError> {
    records.sort_by_key(|r| r.candidate.order);

    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        let key = record.dedup_key();
        if key.is_empty() {
            return Err(AggregationError::EmptyKey {
                name: record.candidate.raw_name.clone(),
                source_name: record.candidate.source_name.clone(),
            });
        }
        if seen.insert(key) {
            unique.push(record);
        }
    }

    unique.sort_by_key(ValidatedRecord::priority);
    if max_results > 0 {
        unique.truncate(max_results);
    }

    tracing::debug!("Aggregated {} unique customers for {}", unique.len(), competitor);

    Ok(ResultSet::new(
        unique.into_iter().map(|r| to_entry(competitor, r)).collect(),
    ))
}

fn to_entry(competitor: &str, record: ValidatedRecord) -> ResultEntry {
    let customer_url = match (record.structure_valid, record.domain) {
        (true, Some(domain)) => Some(domain),
        _ => record.candidate.raw_url,
    };

    ResultEntry {
        competitor: competitor.to_string(),
        customer_name: record.candidate.raw_name,
        customer_url,
        source: record.candidate.source,
        validation: record.validation_status,
        dns_valid: record.dns_valid,
    }
}
