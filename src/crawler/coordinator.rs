//! Concurrency coordinator for per-page tasks
//!
//! Runs a list of fetch-and-parse tasks under a bounded worker pool:
//! - at most `workers` tasks in flight, submitted in batches of `batch-size`
//! - a pause between batches
//! - results collected in completion order
//! - a failed task is logged, counted and dropped; siblings keep running
//! - once `max_results` unique candidates are in hand no new task is
//!   started, but tasks already running finish and are merged

use crate::config::CoordinatorConfig;
use crate::crawler::scheduler::Scheduler;
use crate::jobs::{ProgressEvent, ProgressSink};
use crate::state::{CandidateRecord, SourceKind};
use crate::{FetchError, ParseError};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};

/// Why a single task produced nothing
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl TaskError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_retryable(),
            Self::Parse(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(e) => e.kind(),
            Self::Parse(_) => "parse",
        }
    }
}

/// Outcome of one coordinator run
#[derive(Debug, Default)]
pub struct TaskReport {
    /// Candidates from successful tasks, in completion order
    pub records: Vec<CandidateRecord>,
    /// Tasks started
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
    /// Tasks never started because the result limit was reached
    pub skipped: usize,
    pub stopped_early: bool,
}

impl TaskReport {
    /// Distinct dedup keys among the collected records
    pub fn unique_count(&self) -> usize {
        self.records
            .iter()
            .map(CandidateRecord::dedup_key)
            .collect::<HashSet<_>>()
            .len()
    }
}

type TaskOutput = (usize, String, Result<Vec<CandidateRecord>, TaskError>);

/// Bounded worker pool shared by all sources of a job
#[derive(Debug, Clone)]
pub struct Coordinator {
    scheduler: Scheduler,
}

impl Coordinator {
    pub fn new(config: &CoordinatorConfig) -> Self {
        Self {
            scheduler: Scheduler::new(config),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Runs `task` once per target
    ///
    /// `task` receives the target's submission index and the target itself
    /// (usually a URL). A `max_results` of zero means no early stop.
    pub async fn run<F, Fut>(
        &self,
        source: SourceKind,
        targets: Vec<String>,
        max_results: usize,
        progress: &ProgressSink,
        task: F,
    ) -> TaskReport
    where
        F: Fn(u32, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<CandidateRecord>, TaskError>> + Send + 'static,
    {
        let task = Arc::new(task);
        let workers = self.scheduler.workers();
        let retry = self.scheduler.retry_policy();
        let total = targets.len();

        let mut collector = Collector {
            source,
            total,
            max_results,
            progress_every: self.scheduler.progress_every(),
            progress,
            seen: HashSet::new(),
            report: TaskReport::default(),
        };
        let mut set: JoinSet<TaskOutput> = JoinSet::new();

        tracing::debug!(
            "[{}] running {} tasks with {} workers",
            source,
            total,
            workers
        );

        'batches: for (batch_no, (start, batch)) in self.scheduler.batches(&targets).enumerate() {
            if collector.limit_reached() {
                break;
            }
            if batch_no > 0 {
                self.scheduler.pause_between_batches().await;
            }

            for (offset, target) in batch.iter().enumerate() {
                while set.len() >= workers {
                    if let Some(joined) = set.join_next().await {
                        collector.absorb(joined);
                    }
                }
                if collector.limit_reached() {
                    break 'batches;
                }

                let index = start + offset;
                let target = target.clone();
                let task = Arc::clone(&task);
                collector.report.dispatched += 1;

                set.spawn(async move {
                    let outcome = retry
                        .run(|| (*task)(index as u32, target.clone()), TaskError::is_retryable)
                        .await;
                    (index, target, outcome)
                });
            }

            // Finish the batch before pausing; results are absorbed as they land
            while let Some(joined) = set.join_next().await {
                collector.absorb(joined);
            }
        }

        // Early exit leaves in-flight tasks running; let them drain
        while let Some(joined) = set.join_next().await {
            collector.absorb(joined);
        }

        let mut report = collector.report;
        report.skipped = total - report.dispatched;

        tracing::info!(
            "[{}] {} tasks done: {} succeeded, {} failed, {} skipped",
            source,
            report.dispatched,
            report.completed,
            report.failed,
            report.skipped
        );

        report
    }
}

/// Folds finished tasks into the report and emits progress
struct Collector<'a> {
    source: SourceKind,
    total: usize,
    max_results: usize,
    progress_every: usize,
    progress: &'a ProgressSink,
    seen: HashSet<String>,
    report: TaskReport,
}

impl Collector<'_> {
    fn limit_reached(&self) -> bool {
        self.max_results > 0 && self.seen.len() >= self.max_results
    }

    fn absorb(&mut self, joined: Result<TaskOutput, JoinError>) {
        match joined {
            Ok((index, target, Ok(records))) => {
                self.report.completed += 1;
                let found = records.len();
                for record in &records {
                    self.seen.insert(record.dedup_key());
                }
                self.report.records.extend(records);
                tracing::debug!("[{}] task {} ({}) found {}", self.source, index, target, found);
                self.progress.page_checked(self.source, &target, true, found);

                if self.limit_reached() && !self.report.stopped_early {
                    self.report.stopped_early = true;
                    tracing::info!(
                        "[{}] reached {} unique results, no new tasks will start",
                        self.source,
                        self.max_results
                    );
                }
            }
            Ok((index, target, Err(e))) => {
                self.report.failed += 1;
                tracing::warn!(
                    "[{}] task {} ({}) failed [{}]: {}",
                    self.source,
                    index,
                    target,
                    e.kind(),
                    e
                );
                self.progress.page_checked(self.source, &target, false, 0);
            }
            Err(e) => {
                self.report.failed += 1;
                tracing::error!("[{}] task panicked or was cancelled: {}", self.source, e);
            }
        }

        let finished = self.report.completed + self.report.failed;
        if finished % self.progress_every == 0 {
            self.progress.emit(ProgressEvent::Heartbeat {
                source: self.source,
                completed: finished,
                total: self.total,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn create_test_config(workers: u32, batch_size: u32) -> CoordinatorConfig {
        CoordinatorConfig {
            workers,
            batch_size,
            batch_delay_ms: 0,
            progress_every: 1,
            max_retries: 0,
            retry_backoff_ms: 1,
        }
    }

    fn record(task: u32, name: &str) -> CandidateRecord {
        CandidateRecord::new(
            SourceKind::SubdomainEnumeration,
            "test",
            name,
            Some(format!("https://{}.com", name)),
            task,
            0,
        )
    }

    fn targets(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://vendor.io/customers/c{}", i)).collect()
    }

    #[tokio::test]
    async fn test_failed_task_does_not_abort_siblings() {
        let coordinator = Coordinator::new(&create_test_config(5, 10));

        let report = coordinator
            .run(
                SourceKind::SubdomainEnumeration,
                targets(10),
                0,
                &ProgressSink::disabled(),
                |index, url| async move {
                    if index == 3 {
                        Err(TaskError::Fetch(FetchError::Timeout { url }))
                    } else {
                        Ok(vec![record(index, &format!("customer{}", index))])
                    }
                },
            )
            .await;

        assert_eq!(report.dispatched, 10);
        assert_eq!(report.completed, 9);
        assert_eq!(report.failed, 1);
        assert_eq!(report.records.len(), 9);
        assert!(!report.stopped_early);
    }

    #[tokio::test]
    async fn test_worker_limit_respected() {
        let coordinator = Coordinator::new(&create_test_config(3, 20));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (in_flight_task, peak_task) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let report = coordinator
            .run(
                SourceKind::VendorSite,
                targets(12),
                0,
                &ProgressSink::disabled(),
                move |index, _url| {
                    let in_flight = Arc::clone(&in_flight_task);
                    let peak = Arc::clone(&peak_task);
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(vec![record(index, &format!("c{}", index))])
                    }
                },
            )
            .await;

        assert_eq!(report.completed, 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_early_exit_stops_new_tasks_and_drains() {
        let coordinator = Coordinator::new(&create_test_config(2, 4));

        let report = coordinator
            .run(
                SourceKind::SubdomainEnumeration,
                targets(20),
                3,
                &ProgressSink::disabled(),
                |index, _url| async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok(vec![record(index, &format!("c{}", index))])
                },
            )
            .await;

        assert!(report.stopped_early);
        assert!(report.dispatched < 20);
        assert_eq!(report.completed + report.failed, report.dispatched);
        assert_eq!(report.skipped, 20 - report.dispatched);
        assert!(report.records.len() >= 3);
        assert_eq!(report.records.len(), report.dispatched);
    }

    #[tokio::test]
    async fn test_duplicates_do_not_count_towards_limit() {
        let coordinator = Coordinator::new(&create_test_config(1, 10));

        let report = coordinator
            .run(
                SourceKind::SearchEngine,
                targets(6),
                2,
                &ProgressSink::disabled(),
                |index, _url| async move { Ok(vec![record(index, "same")]) },
            )
            .await;

        assert!(!report.stopped_early);
        assert_eq!(report.dispatched, 6);
        assert_eq!(report.unique_count(), 1);
    }

    #[tokio::test]
    async fn test_progress_events_per_task() {
        let coordinator = Coordinator::new(&create_test_config(2, 2));
        let (sink, mut rx) = ProgressSink::channel();

        coordinator
            .run(
                SourceKind::VendorSite,
                targets(4),
                0,
                &sink,
                |index, url| async move {
                    if index == 0 {
                        Err(TaskError::Parse(ParseError::EmptyDocument { url }))
                    } else {
                        Ok(vec![])
                    }
                },
            )
            .await;
        drop(sink);

        let mut checked = 0;
        let mut failed = 0;
        let mut heartbeats = 0;
        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::PageChecked { succeeded, .. } => {
                    checked += 1;
                    if !succeeded {
                        failed += 1;
                    }
                }
                ProgressEvent::Heartbeat { .. } => heartbeats += 1,
                _ => {}
            }
        }

        assert_eq!(checked, 4);
        assert_eq!(failed, 1);
        assert_eq!(heartbeats, 4);
    }

    #[tokio::test]
    async fn test_retryable_failures_are_retried() {
        let config = CoordinatorConfig {
            max_retries: 2,
            ..create_test_config(2, 5)
        };
        let coordinator = Coordinator::new(&config);
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_task = Arc::clone(&attempts);

        let report = coordinator
            .run(
                SourceKind::FeaturedCustomers,
                targets(1),
                0,
                &ProgressSink::disabled(),
                move |index, url| {
                    let attempts = Arc::clone(&attempts_task);
                    async move {
                        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err(TaskError::Fetch(FetchError::HttpStatus { url, code: 503 }))
                        } else {
                            Ok(vec![record(index, "acme")])
                        }
                    }
                },
            )
            .await;

        assert_eq!(report.completed, 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_target_list() {
        let coordinator = Coordinator::new(&create_test_config(2, 2));
        let report = coordinator
            .run(
                SourceKind::VendorSite,
                Vec::new(),
                5,
                &ProgressSink::disabled(),
                |_index, _url| async move { Ok(vec![]) },
            )
            .await;
        assert_eq!(report.dispatched, 0);
        assert!(report.records.is_empty());
    }
}
