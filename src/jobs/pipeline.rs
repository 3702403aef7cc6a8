//! One job's run from sources to summary
//!
//! Stages, each reported through the job's progress sink:
//! 1. every source runs concurrently; a failing source is logged and skipped
//! 2. candidates are screened, validated and checked against the gate
//! 3. survivors are deduplicated and capped
//! 4. the summarizer turns the corpus into the final table

use crate::aggregate::aggregate;
use crate::jobs::progress::{ProgressEvent, ProgressSink};
use crate::jobs::store::LogLevel;
use crate::sources::CustomerSource;
use crate::state::{CandidateRecord, GroupState, GroupValidation, JobStatus, SourceKind};
use crate::summarize::{build_corpus, Summarizer, TableRow};
use crate::validate::{group_summary, unique_valid_count, ValidationGate, Validator};
use crate::ScoutError;
use std::sync::Arc;
use tokio::task::JoinSet;

const STEP_STARTED: u8 = 5;
const STEP_SOURCES_FIRST: u8 = 10;
const STEP_SOURCES_LAST: u8 = 70;
const STEP_VALIDATION: u8 = 75;
const STEP_AGGREGATION: u8 = 85;
const STEP_SUMMARY: u8 = 95;

/// Everything a job needs, shared by all jobs of a service
pub struct Pipeline {
    pub sources: Vec<Arc<dyn CustomerSource>>,
    pub validator: Validator,
    pub gate: ValidationGate,
    pub summarizer: Arc<dyn Summarizer>,
}

/// What one source produced
struct SourceOutcome {
    rank: usize,
    kind: SourceKind,
    name: String,
    result: Result<Vec<CandidateRecord>, String>,
}

impl Pipeline {
    /// Runs every stage for `vendor_name`
    ///
    /// Returns the terminal status and table on success. Errors carry the
    /// stage that failed; the caller turns them into the job's error details.
    pub async fn run(
        &self,
        vendor_name: &str,
        max_results: usize,
        progress: &ProgressSink,
    ) -> Result<(JobStatus, Vec<TableRow>), ScoutError> {
        progress.step(STEP_STARTED, format!("Collecting customers of {}", vendor_name));
        tracing::info!(
            "Starting discovery for {} with {} sources (max {} results)",
            vendor_name,
            self.sources.len(),
            max_results
        );

        let outcomes = self.collect(vendor_name, max_results, progress).await;
        progress.status(JobStatus::Processing);

        let mut candidates = Vec::new();
        let mut failures = Vec::new();
        let mut ran = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            ran.push((outcome.kind, outcome.result.is_ok()));
            match outcome.result {
                Ok(records) => candidates.extend(
                    records
                        .into_iter()
                        .map(|r| r.ranked(outcome.rank as u16)),
                ),
                Err(reason) => failures.push(format!("{}: {}", outcome.name, reason)),
            }
        }

        if !ran.is_empty() && failures.len() == ran.len() {
            tracing::error!("Every source failed for {}", vendor_name);
            return Err(ScoutError::Collection { reasons: failures });
        }

        // Validation
        progress.step(
            STEP_VALIDATION,
            format!("Validating {} candidates", candidates.len()),
        );
        let (screened, tally) = self.validator.screen(vendor_name, candidates);
        let validated = self.validator.validate_all(screened).await;

        let mut summary = group_summary(&validated, &ran);
        let gate = self.gate.check(&validated, &tally);
        let valid_count = unique_valid_count(&validated);
        summary.combined = match &gate {
            Ok(0) => GroupValidation::new(GroupState::Empty, 0),
            Ok(count) => GroupValidation::new(GroupState::Passed, *count),
            Err(_) => GroupValidation::new(GroupState::Failed, valid_count),
        };
        progress.emit(ProgressEvent::Validation(summary));

        if let Err(e) = gate {
            tracing::warn!("Validation gate failed for {}: {}", vendor_name, e);
            return Err(e.into());
        }
        progress.log(
            LogLevel::Success,
            format!("Validation passed with {} valid records", valid_count),
        );

        // Aggregation
        let results = aggregate(vendor_name, validated, max_results)?;
        progress.step(
            STEP_AGGREGATION,
            format!("{} unique customers", results.len()),
        );
        progress.emit(ProgressEvent::UniqueCompanies(results.len()));
        progress.emit(ProgressEvent::PartialResults(results.clone()));

        // Summary
        progress.step(STEP_SUMMARY, "Summarizing results");
        let corpus = build_corpus(vendor_name, &results);
        let rows = self.summarizer.summarize(vendor_name, &corpus).await?;

        let status = if !failures.is_empty() && !results.is_empty() {
            for failure in &failures {
                progress.log(LogLevel::Warning, format!("Source error: {}", failure));
            }
            JobStatus::CompletedWithErrors
        } else {
            JobStatus::Completed
        };

        tracing::info!(
            "Discovery for {} finished: {} rows, {} source failures",
            vendor_name,
            rows.len(),
            failures.len()
        );
        Ok((status, rows))
    }

    /// Runs all sources concurrently, returning outcomes in source order
    async fn collect(
        &self,
        vendor_name: &str,
        max_results: usize,
        progress: &ProgressSink,
    ) -> Vec<SourceOutcome> {
        let total = self.sources.len();
        let mut tasks = JoinSet::new();
        let expected: Vec<(SourceKind, String)> = self
            .sources
            .iter()
            .map(|s| (s.kind(), s.name().to_string()))
            .collect();

        for (rank, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            let vendor = vendor_name.to_string();
            let sink = progress.clone();
            tasks.spawn(async move {
                let result = source
                    .produce(&vendor, max_results, &sink)
                    .await
                    .map_err(|e| e.to_string());
                SourceOutcome {
                    rank,
                    kind: source.kind(),
                    name: source.name().to_string(),
                    result,
                }
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        let mut done = 0;
        while let Some(joined) = tasks.join_next().await {
            done += 1;
            match joined {
                Ok(outcome) => {
                    match &outcome.result {
                        Ok(records) => {
                            tracing::info!("[{}] {} candidates", outcome.name, records.len());
                            progress.emit(ProgressEvent::SourceFinished {
                                source: outcome.kind,
                                name: outcome.name.clone(),
                                count: records.len(),
                            });
                        }
                        Err(reason) => {
                            tracing::warn!("[{}] failed: {}", outcome.name, reason);
                            progress.emit(ProgressEvent::SourceFailed {
                                source: outcome.kind,
                                name: outcome.name.clone(),
                                reason: reason.clone(),
                            });
                        }
                    }
                    outcomes.push(outcome);
                }
                Err(e) => tracing::error!("Source task panicked: {}", e),
            }

            let span = (STEP_SOURCES_LAST - STEP_SOURCES_FIRST) as usize;
            let step = STEP_SOURCES_FIRST as usize + span * done / total.max(1);
            progress.step(step as u8, format!("{}/{} sources finished", done, total));
        }

        // A task that panicked never reported back; it counts as failed
        for (rank, (kind, name)) in expected.into_iter().enumerate() {
            if outcomes.iter().any(|o| o.rank == rank) {
                continue;
            }
            let reason = "source task panicked".to_string();
            progress.emit(ProgressEvent::SourceFailed {
                source: kind,
                name: name.clone(),
                reason: reason.clone(),
            });
            outcomes.push(SourceOutcome {
                rank,
                kind,
                name,
                result: Err(reason),
            });
        }

        outcomes.sort_by_key(|o| o.rank);
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::sources::SourceError;
    use crate::summarize::{LocalSummarizer, SummarizationError};
    use crate::validate::StaticResolver;
    use async_trait::async_trait;

    struct FixedSource {
        kind: SourceKind,
        name: &'static str,
        records: Option<Vec<(&'static str, Option<&'static str>)>>,
    }

    #[async_trait]
    impl CustomerSource for FixedSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn name(&self) -> &str {
            self.name
        }

        async fn produce(
            &self,
            _vendor_name: &str,
            _max_results: usize,
            _progress: &ProgressSink,
        ) -> Result<Vec<CandidateRecord>, SourceError> {
            match &self.records {
                Some(records) => Ok(records
                    .iter()
                    .enumerate()
                    .map(|(i, (name, url))| {
                        CandidateRecord::new(
                            self.kind,
                            self.name,
                            *name,
                            url.map(str::to_string),
                            i as u32,
                            0,
                        )
                    })
                    .collect()),
                None => Err(SourceError::AllRequestsFailed {
                    source_name: self.name.to_string(),
                    attempted: 1,
                }),
            }
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl CustomerSource for PanickingSource {
        fn kind(&self) -> SourceKind {
            SourceKind::ReviewSite
        }

        fn name(&self) -> &str {
            "review_site:broken"
        }

        async fn produce(
            &self,
            _vendor_name: &str,
            _max_results: usize,
            _progress: &ProgressSink,
        ) -> Result<Vec<CandidateRecord>, SourceError> {
            panic!("parser bug");
        }
    }

    fn broken() -> Arc<dyn CustomerSource> {
        Arc::new(PanickingSource)
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _: &str, _: &str) -> Result<Vec<TableRow>, SummarizationError> {
            Err(SummarizationError::new("model unavailable"))
        }
    }

    fn source(
        kind: SourceKind,
        name: &'static str,
        records: Option<Vec<(&'static str, Option<&'static str>)>>,
    ) -> Arc<dyn CustomerSource> {
        Arc::new(FixedSource {
            kind,
            name,
            records,
        })
    }

    fn pipeline(sources: Vec<Arc<dyn CustomerSource>>, min_valid: usize) -> Pipeline {
        Pipeline {
            sources,
            validator: Validator::new(
                &ValidationConfig::default(),
                Some(Arc::new(StaticResolver::new(["globex.com", "initech.com"]))),
                4,
            ),
            gate: ValidationGate::new(min_valid),
            summarizer: Arc::new(LocalSummarizer::new()),
        }
    }

    #[tokio::test]
    async fn test_completes_with_rows() {
        let pipeline = pipeline(
            vec![
                source(
                    SourceKind::VendorSite,
                    "vendor_site",
                    Some(vec![("Globex", Some("https://globex.com")), ("Initech", Some("initech.com"))]),
                ),
                source(
                    SourceKind::SearchEngine,
                    "search_engine",
                    Some(vec![("Globex Corp", Some("www.globex.com"))]),
                ),
            ],
            2,
        );

        let (status, rows) = pipeline
            .run("Acme", 10, &ProgressSink::disabled())
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Completed);
        let names: Vec<_> = rows.iter().map(|r| r.customer_name.as_str()).collect();
        assert_eq!(names, vec!["Globex", "Initech"]);
    }

    #[tokio::test]
    async fn test_source_failure_completes_with_errors() {
        let pipeline = pipeline(
            vec![
                source(SourceKind::VendorSite, "vendor_site", None),
                source(
                    SourceKind::SearchEngine,
                    "search_engine",
                    Some(vec![("Globex", Some("globex.com"))]),
                ),
            ],
            1,
        );

        let (status, rows) = pipeline
            .run("Acme", 10, &ProgressSink::disabled())
            .await
            .unwrap();
        assert_eq!(status, JobStatus::CompletedWithErrors);
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_all_sources_failed_is_collection_error() {
        let pipeline = pipeline(vec![source(SourceKind::VendorSite, "vendor_site", None)], 0);
        let err = pipeline
            .run("Acme", 10, &ProgressSink::disabled())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "collection_error");
        assert!(err.reasons()[0].contains("vendor_site"));
    }

    #[tokio::test]
    async fn test_panicked_sources_count_as_failed() {
        let pipeline = pipeline(vec![broken(), broken()], 0);
        let err = pipeline
            .run("Acme", 10, &ProgressSink::disabled())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "collection_error");
        assert_eq!(err.reasons().len(), 2);
        assert!(err.reasons()[0].contains("review_site:broken"));
    }

    #[tokio::test]
    async fn test_panicked_source_beside_working_one() {
        let pipeline = pipeline(
            vec![
                broken(),
                source(
                    SourceKind::VendorSite,
                    "vendor_site",
                    Some(vec![("Globex", Some("globex.com"))]),
                ),
            ],
            1,
        );
        let (status, rows) = pipeline
            .run("Acme", 10, &ProgressSink::disabled())
            .await
            .unwrap();
        assert_eq!(status, JobStatus::CompletedWithErrors);
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_gate_failure_reports_reasons() {
        let pipeline = pipeline(
            vec![source(
                SourceKind::VendorSite,
                "vendor_site",
                Some(vec![("Globex", Some("globex.com")), ("Logo", None)]),
            )],
            3,
        );

        let (sink, mut rx) = ProgressSink::channel();
        let err = pipeline.run("Acme", 10, &sink).await.unwrap_err();
        drop(sink);

        assert_eq!(err.error_type(), "validation_error");
        assert_eq!(
            err.reasons()[0],
            "Insufficient structurally valid records: 1/3 required"
        );

        let mut combined = None;
        while let Some(event) = rx.recv().await {
            if let ProgressEvent::Validation(summary) = event {
                combined = Some(summary.combined);
            }
        }
        assert_eq!(combined.map(|c| c.status), Some(GroupState::Failed));
    }

    #[tokio::test]
    async fn test_empty_data_with_zero_minimum_completes() {
        let pipeline = pipeline(vec![source(SourceKind::VendorSite, "vendor_site", Some(vec![]))], 0);
        let (status, rows) = pipeline
            .run("Acme", 10, &ProgressSink::disabled())
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Completed);
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_summarizer_failure_propagates() {
        let mut pipeline = pipeline(
            vec![source(
                SourceKind::VendorSite,
                "vendor_site",
                Some(vec![("Globex", Some("globex.com"))]),
            )],
            1,
        );
        pipeline.summarizer = Arc::new(FailingSummarizer);

        let err = pipeline
            .run("Acme", 10, &ProgressSink::disabled())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "summarization_error");
        assert!(err.reasons()[0].contains("model unavailable"));
    }
}
