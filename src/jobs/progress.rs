//! Progress events and the per-job status aggregator
//!
//! Sources, the coordinator and the pipeline never touch job state directly.
//! They send [`ProgressEvent`]s through a [`ProgressSink`]; a single
//! aggregator task per job drains the channel and applies each event to the
//! job store, so every job has exactly one writer.

use crate::jobs::store::{ErrorDetails, JobId, JobStore, LogLevel};
use crate::state::{JobStatus, ResultSet, SourceKind, ValidationSummary};
use crate::summarize::TableRow;
use tokio::sync::mpsc;

/// Something that happened while a job ran
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Move the job forward; backward moves are ignored
    Status(JobStatus),

    /// Overall completion percentage; lower values are ignored
    Step { step: u8, message: String },

    /// An enumerating source finished computing its page set
    SlugsDiscovered { source: SourceKind, count: usize },

    /// One unit of work (page, slug or query) finished
    PageChecked {
        source: SourceKind,
        url: String,
        succeeded: bool,
        found: usize,
    },

    /// Periodic tick from the coordinator, even when nothing new was found
    Heartbeat {
        source: SourceKind,
        completed: usize,
        total: usize,
    },

    /// A source returned its capped candidate list
    SourceFinished {
        source: SourceKind,
        name: String,
        count: usize,
    },

    /// A source could not produce anything
    SourceFailed {
        source: SourceKind,
        name: String,
        reason: String,
    },

    UniqueCompanies(usize),

    Validation(ValidationSummary),

    PartialResults(ResultSet),

    Log { level: LogLevel, message: String },

    /// Terminal outcome; always the last event of a job
    Finished {
        status: JobStatus,
        results: Vec<TableRow>,
        error: Option<ErrorDetails>,
    },
}

/// Sending half of a job's progress channel
///
/// Cheap to clone; every task of a job holds one. Sending never blocks and
/// never fails the sender: once the aggregator is gone, events are dropped.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    /// Creates a connected sink and the receiver the aggregator reads from
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards everything
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn status(&self, status: JobStatus) {
        self.emit(ProgressEvent::Status(status));
    }

    pub fn step(&self, step: u8, message: impl Into<String>) {
        self.emit(ProgressEvent::Step {
            step,
            message: message.into(),
        });
    }

    pub fn page_checked(&self, source: SourceKind, url: &str, succeeded: bool, found: usize) {
        self.emit(ProgressEvent::PageChecked {
            source,
            url: url.to_string(),
            succeeded,
            found,
        });
    }

    /// Adds an entry to the job log
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(ProgressEvent::Log {
            level,
            message: message.into(),
        });
    }
}

/// Drains a job's progress channel into the store until every sink is dropped
pub async fn run_status_aggregator(
    job_id: JobId,
    store: JobStore,
    mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
) {
    while let Some(event) = rx.recv().await {
        if !store.update(&job_id, |job| job.apply(event)) {
            tracing::warn!("Progress event for unknown job {}", job_id);
        }
    }
    tracing::debug!("Status aggregator for job {} finished", job_id);
}
