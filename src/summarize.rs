//! Summarization step
//!
//! Once the validation gate passes, the aggregated result set is flattened
//! into a plain-text corpus and handed to a [`Summarizer`], which returns the
//! final customer table. [`LocalSummarizer`] reads the corpus back line by
//! line; other implementations can call out to a model service.

use crate::state::ResultSet;
use crate::url::{clean_domain, vendor_slug};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// One row of the final customer table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub competitor: String,
    pub customer_name: String,
    pub customer_url: String,
}

/// Failure reported by a summarizer, carried into the job's error details
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("summarizer failed: {message}")]
pub struct SummarizationError {
    pub message: String,
}

impl SummarizationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Turns a job's corpus into table rows
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        vendor_name: &str,
        corpus: &str,
    ) -> Result<Vec<TableRow>, SummarizationError>;
}

/// Renders `results` as the text corpus a summarizer reads
///
/// Comment lines start with `#`; every entry is one `name, url` line, with
/// the URL left empty when none was found.
pub fn build_corpus(vendor_name: &str, results: &ResultSet) -> String {
    let mut corpus = String::new();
    corpus.push_str(&format!("# Customers of {}\n", vendor_name));
    corpus.push_str(&format!("# {} candidates, one per line: name, url\n", results.len()));

    for entry in results.iter() {
        let name = entry.customer_name.replace(',', " ");
        let url = entry.customer_url.as_deref().unwrap_or_default();
        let line = format!("{}, {}", name.trim(), url.trim());
        corpus.push_str(line.trim_end());
        corpus.push('\n');
    }
    corpus
}

/// Summarizer that parses the corpus without any remote service
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSummarizer;

impl LocalSummarizer {
    pub fn new() -> Self {
        Self
    }

    fn row(vendor_name: &str, line: &str) -> Option<TableRow> {
        let (name, url) = match line.split_once(',') {
            Some((name, url)) => (name.trim(), url.trim()),
            None => (line.trim(), ""),
        };
        if name.is_empty() || name.eq_ignore_ascii_case(vendor_name.trim()) {
            return None;
        }

        let customer_url = if url.is_empty() {
            format!("{}.com", vendor_slug(name))
        } else {
            clean_domain(url)?
        };

        Some(TableRow {
            competitor: vendor_name.to_string(),
            customer_name: name.to_string(),
            customer_url,
        })
    }
}

#[async_trait]
impl Summarizer for LocalSummarizer {
    async fn summarize(
        &self,
        vendor_name: &str,
        corpus: &str,
    ) -> Result<Vec<TableRow>, SummarizationError> {
        let mut seen = HashSet::new();
        let rows: Vec<TableRow> = corpus
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| Self::row(vendor_name, line))
            .filter(|row| seen.insert(row.customer_name.to_lowercase()))
            .collect();

        tracing::debug!("Summarized {} rows for {}", rows.len(), vendor_name);
        Ok(rows)
    }
}
