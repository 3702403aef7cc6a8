//! In-memory job registry
//!
//! The store is shared by the job service (creates jobs, serves snapshots)
//! and one status aggregator per job (the only writer of that job). The
//! lock is never held across an await; every access is a short closure.

use crate::jobs::progress::ProgressEvent;
use crate::state::{JobMetrics, JobStatus, ResultSet, ValidationSummary};
use crate::summarize::TableRow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// Identifier handed out by `submit_job`
pub type JobId = Uuid;

/// Severity of a job log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// `error_details` of a failed job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetails {
    #[serde(rename = "type")]
    pub error_type: String,
    pub reasons: Vec<String>,
}

impl ErrorDetails {
    pub fn new(error_type: impl Into<String>, reasons: Vec<String>) -> Self {
        Self {
            error_type: error_type.into(),
            reasons,
        }
    }
}

/// Full state of one job
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub vendor_name: String,
    pub max_results: usize,
    pub status: JobStatus,
    pub progress_step: u8,
    pub progress_message: String,
    pub metrics: JobMetrics,
    pub validation: ValidationSummary,
    pub partial_results: ResultSet,
    pub results: Vec<TableRow>,
    pub error_details: Option<ErrorDetails>,
    pub logs: VecDeque<LogEntry>,
    log_capacity: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    fn new(vendor_name: &str, max_results: usize, log_capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            vendor_name: vendor_name.to_string(),
            max_results,
            status: JobStatus::Started,
            progress_step: 0,
            progress_message: "Job queued".to_string(),
            metrics: JobMetrics::new(max_results),
            validation: ValidationSummary::default(),
            partial_results: ResultSet::default(),
            results: Vec::new(),
            error_details: None,
            logs: VecDeque::with_capacity(log_capacity),
            log_capacity: log_capacity.max(1),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Moves to `next` unless that would go backwards or leave a terminal state
    pub fn advance(&mut self, next: JobStatus) -> bool {
        if self.status == next || !self.status.can_transition_to(next) {
            return false;
        }
        tracing::debug!("Job {}: {} -> {}", self.id, self.status, next);
        self.status = next;
        true
    }

    pub fn push_log(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.logs.len() >= self.log_capacity {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        });
    }

    /// Folds one progress event into the job
    ///
    /// Events arriving after the job reached a terminal state are ignored.
    pub fn apply(&mut self, event: ProgressEvent) {
        if self.status.is_terminal() {
            return;
        }
        self.metrics.progress_updates += 1;

        match event {
            ProgressEvent::Status(status) => {
                self.advance(status);
            }
            ProgressEvent::Step { step, message } => {
                if step >= self.progress_step {
                    self.progress_step = step.min(100);
                    self.progress_message = message;
                }
            }
            ProgressEvent::SlugsDiscovered { source, count } => {
                self.advance(JobStatus::SubdomainsDiscovered);
                self.push_log(
                    LogLevel::Info,
                    format!("[{}] discovered {} customer pages", source, count),
                );
            }
            ProgressEvent::PageChecked {
                url,
                succeeded,
                found,
                ..
            } => {
                self.advance(JobStatus::Processing);
                self.metrics.record_page(&url, succeeded, found);
            }
            ProgressEvent::Heartbeat {
                source,
                completed,
                total,
            } => {
                self.progress_message = format!("[{}] {}/{} pages checked", source, completed, total);
            }
            ProgressEvent::SourceFinished {
                source,
                name,
                count,
            } => {
                self.metrics.companies_found += count as u64;
                self.push_log(
                    LogLevel::Success,
                    format!("{} ({}) returned {} candidates", name, source, count),
                );
            }
            ProgressEvent::SourceFailed {
                source,
                name,
                reason,
            } => {
                self.push_log(
                    LogLevel::Warning,
                    format!("{} ({}) failed: {}", name, source, reason),
                );
            }
            ProgressEvent::UniqueCompanies(count) => {
                self.metrics.observe_unique(count);
            }
            ProgressEvent::Validation(summary) => {
                self.validation = summary;
            }
            ProgressEvent::PartialResults(results) => {
                self.metrics.observe_unique(results.len());
                self.partial_results = results;
            }
            ProgressEvent::Log { level, message } => {
                self.push_log(level, message);
            }
            ProgressEvent::Finished {
                status,
                results,
                error,
            } => {
                if !status.is_terminal() {
                    tracing::warn!("Job {}: ignoring non-terminal finish {}", self.id, status);
                    return;
                }
                self.status = status;
                self.progress_step = 100;
                self.progress_message = match &error {
                    Some(details) => format!("Job failed: {}", details.error_type),
                    None => format!("Job {}", status),
                };
                self.results = results;
                self.error_details = error;
                self.finished_at = Some(Utc::now());
                self.metrics.elapsed_secs = self.elapsed_secs();
            }
        }
    }

    /// Seconds since the job started, frozen once it finished
    pub fn elapsed_secs(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// Serializable view for status pollers
    pub fn report(&self) -> JobReport {
        let mut metrics = self.metrics.clone();
        metrics.elapsed_secs = self.elapsed_secs();

        JobReport {
            job_id: self.id,
            vendor_name: self.vendor_name.clone(),
            max_results: self.max_results,
            status: self.status,
            progress: Progress {
                step: self.progress_step,
                message: self.progress_message.clone(),
            },
            metrics,
            validation_status: self.validation,
            partial_results: self.partial_results.clone(),
            results: self.results.clone(),
            error_details: self.error_details.clone(),
            logs: self.logs.iter().cloned().collect(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    /// 0 to 100, never decreasing
    pub step: u8,
    pub message: String,
}

/// Status payload returned by `get_job_status`
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: JobId,
    pub vendor_name: String,
    pub max_results: usize,
    pub status: JobStatus,
    pub progress: Progress,
    pub metrics: JobMetrics,
    pub validation_status: ValidationSummary,
    pub partial_results: ResultSet,
    pub results: Vec<TableRow>,
    pub error_details: Option<ErrorDetails>,
    pub logs: Vec<LogEntry>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Shared, cloneable handle to every job in the process
#[derive(Debug, Clone)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
    log_capacity: usize,
}

impl JobStore {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            log_capacity,
        }
    }

    /// Registers a new job in the `started` state
    pub fn create(&self, vendor_name: &str, max_results: usize) -> JobId {
        let job = Job::new(vendor_name, max_results, self.log_capacity);
        let id = job.id;
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, job);
        id
    }

    /// Runs `f` on the job; false if the job does not exist
    pub fn update<F>(&self, id: &JobId, f: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        match jobs.get_mut(id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    /// Copy of the job as it is right now
    pub fn snapshot(&self, id: &JobId) -> Option<Job> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn report(&self, id: &JobId) -> Option<JobReport> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(Job::report)
    }

    /// A still-running job for the same vendor (case-insensitive) and limit
    pub fn find_running(&self, vendor_name: &str, max_results: usize) -> Option<JobId> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        running_match(&jobs, vendor_name, max_results)
    }

    /// Id of a running job for the same request, or of a newly created one
    ///
    /// Lookup and insert happen under one write lock, so concurrent callers
    /// agree on a single job. The flag is true when the job is new.
    pub fn find_running_or_create(&self, vendor_name: &str, max_results: usize) -> (JobId, bool) {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = running_match(&jobs, vendor_name, max_results) {
            return (id, false);
        }

        let job = Job::new(vendor_name, max_results, self.log_capacity);
        let id = job.id;
        jobs.insert(id, job);
        (id, true)
    }

    /// Drops terminal jobs that finished more than `older_than` ago
    pub fn remove_finished_before(&self, older_than: Duration) -> usize {
        let cutoff = chrono::Duration::from_std(older_than)
            .map(|age| Utc::now() - age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let before = jobs.len();
        jobs.retain(|_, job| match job.finished_at {
            Some(finished) => finished > cutoff,
            None => true,
        });
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize_vendor(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn running_match(jobs: &HashMap<JobId, Job>, vendor_name: &str, max_results: usize) -> Option<JobId> {
    let wanted = normalize_vendor(vendor_name);
    jobs.values()
        .filter(|job| job.status.is_running() && job.max_results == max_results)
        .filter(|job| normalize_vendor(&job.vendor_name) == wanted)
        .min_by_key(|job| job.started_at)
        .map(|job| job.id)
}
