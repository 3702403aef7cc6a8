//! State module for tracking job progress
//!
//! # Components
//!
//! - `JobStatus`: forward-only job lifecycle (started, processing, terminal states)
//! - `CandidateRecord` / `ValidatedRecord` / `ResultSet`: data flowing through the pipeline
//! - `JobMetrics` / `ValidationSummary`: counters and per-bucket validation state

mod job_status;
mod metrics;
mod records;

// Re-export main types
pub use job_status::JobStatus;
pub use metrics::{GroupState, GroupValidation, JobMetrics, ValidationSummary};
pub use records::{
    CandidateRecord, DiscoveryOrder, ResultEntry, ResultSet, SourceKind, ValidatedRecord,
    ValidationGroup, ValidationStatus,
};
