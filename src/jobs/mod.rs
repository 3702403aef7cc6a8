//! Job lifecycle
//!
//! [`JobService`] is the entry point callers use: it accepts jobs, runs each
//! one on the tokio runtime and serves status snapshots from the
//! [`JobStore`]. Every job gets its own progress channel drained by a single
//! status aggregator, so polling never races with the pipeline.

mod pipeline;
mod progress;
mod store;

pub use pipeline::Pipeline;
pub use progress::{run_status_aggregator, ProgressEvent, ProgressSink};
pub use store::{ErrorDetails, Job, JobId, JobReport, JobStore, LogEntry, LogLevel, Progress};

use crate::config::{self, Config};
use crate::crawler::{Fetcher, HttpFetcher};
use crate::sources::{build_sources, SourceContext};
use crate::state::JobStatus;
use crate::summarize::{LocalSummarizer, Summarizer};
use crate::validate::{DnsResolver, TokioDnsResolver, ValidationGate, Validator};
use crate::{Result, ScoutError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Submits discovery jobs and answers status queries
#[derive(Clone)]
pub struct JobService {
    config: Arc<Config>,
    store: JobStore,
    pipeline: Arc<Pipeline>,
}

impl JobService {
    /// Builds a service with the HTTP fetcher, system DNS and local summarizer
    pub fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.fetcher)?);
        let resolver: Option<Arc<dyn DnsResolver>> = if config.validation.check_dns {
            Some(Arc::new(TokioDnsResolver::new(
                Duration::from_millis(config.fetcher.dns_timeout_ms),
                Duration::from_secs(config.validation.dns_cache_ttl_secs),
            )))
        } else {
            None
        };

        Self::with_components(config, fetcher, resolver, Arc::new(LocalSummarizer::new()))
    }

    /// Builds a service around caller-supplied collaborators
    ///
    /// A `resolver` of `None` disables DNS checks.
    pub fn with_components(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        resolver: Option<Arc<dyn DnsResolver>>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self> {
        config::validate(&config)?;

        let ctx = SourceContext::new(fetcher, &config);
        let pipeline = Pipeline {
            sources: build_sources(&config, ctx),
            validator: Validator::new(
                &config.validation,
                resolver,
                config.fetcher.max_connections as usize,
            ),
            gate: ValidationGate::new(config.validation.min_valid_records),
            summarizer,
        };

        Ok(Self {
            store: JobStore::new(config.jobs.log_capacity),
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Starts a job and returns its id without waiting for it
    ///
    /// With `dedupe-concurrent-jobs` set, a running job for the same vendor
    /// and limit is returned instead of starting another.
    pub fn submit_job(&self, vendor_name: &str, max_results: usize) -> Result<JobId> {
        let vendor_name = vendor_name.trim();
        if vendor_name.is_empty() {
            return Err(ScoutError::InvalidRequest(
                "vendor name cannot be blank".to_string(),
            ));
        }
        if max_results == 0 {
            return Err(ScoutError::InvalidRequest(
                "max_results must be at least 1".to_string(),
            ));
        }

        let job_id = if self.config.jobs.dedupe_concurrent_jobs {
            let (id, created) = self.store.find_running_or_create(vendor_name, max_results);
            if !created {
                tracing::info!("Reusing running job {} for {}", id, vendor_name);
                return Ok(id);
            }
            id
        } else {
            self.store.create(vendor_name, max_results)
        };
        let (sink, rx) = ProgressSink::channel();
        tokio::spawn(run_status_aggregator(job_id, self.store.clone(), rx));

        let pipeline = Arc::clone(&self.pipeline);
        let timeout = self.config.jobs.job_timeout_secs;
        let vendor = vendor_name.to_string();

        tokio::spawn(async move {
            let run = pipeline.run(&vendor, max_results, &sink);
            let outcome = match timeout {
                Some(seconds) => tokio::time::timeout(Duration::from_secs(seconds), run)
                    .await
                    .unwrap_or(Err(ScoutError::JobTimeout { seconds })),
                None => run.await,
            };

            let finished = match outcome {
                Ok((status, results)) => {
                    tracing::info!("Job {} finished: {}", job_id, status);
                    ProgressEvent::Finished {
                        status,
                        results,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!("Job {} failed: {}", job_id, e);
                    sink.log(LogLevel::Error, e.to_string());
                    ProgressEvent::Finished {
                        status: JobStatus::Failed,
                        results: Vec::new(),
                        error: Some(ErrorDetails::new(e.error_type(), e.reasons())),
                    }
                }
            };
            sink.emit(finished);
        });

        tracing::info!("Submitted job {} for {} (max {})", job_id, vendor_name, max_results);
        Ok(job_id)
    }

    /// Snapshot of a job, `None` for unknown or cleaned-up ids
    pub fn get_job_status(&self, job_id: &JobId) -> Option<JobReport> {
        self.store.report(job_id)
    }

    /// Polls until the job reaches a terminal state
    pub async fn wait_for_job(&self, job_id: &JobId, poll_interval: Duration) -> Option<JobReport> {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            let report = self.get_job_status(job_id)?;
            if report.status.is_terminal() {
                return Some(report);
            }
        }
    }

    /// Forgets jobs that finished more than `older_than` ago
    pub fn cleanup_finished_jobs(&self, older_than: Duration) -> usize {
        let removed = self.store.remove_finished_before(older_than);
        if removed > 0 {
            tracing::info!("Removed {} finished jobs", removed);
        }
        removed
    }

    /// Runs cleanup every `interval` with the configured retention
    pub fn spawn_cleanup_task(&self, interval: Duration) -> JoinHandle<()> {
        let service = self.clone();
        let retention = Duration::from_secs(self.config.jobs.retention_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                service.cleanup_finished_jobs(retention);
            }
        })
    }
}
