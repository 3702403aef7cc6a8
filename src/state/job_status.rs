//! Job status definitions for tracking pipeline progress
//!
//! A job only ever moves forward through these states; terminal states are final.
use serde::Serialize;
use std::fmt;

/// Represents the current stage of a discovery job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    // ===== Running States =====
    /// Job accepted, sources not yet producing
    Started,

    /// The enumerated customer page set has been computed
    SubdomainsDiscovered,

    /// Pages are being fetched and parsed
    Processing,

    // ===== Terminal States =====
    /// Finished; results may be empty
    Completed,

    /// Finished with results, but at least one source errored
    CompletedWithErrors,

    /// Validation gate, collection, summarization or time limit failure
    Failed,
}

impl JobStatus {
    /// Position in the pipeline; transitions never lower it
    fn rank(&self) -> u8 {
        match self {
            Self::Started => 0,
            Self::SubdomainsDiscovered => 1,
            Self::Processing => 2,
            Self::Completed | Self::CompletedWithErrors | Self::Failed => 3,
        }
    }

    /// Returns true if no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithErrors | Self::Failed
        )
    }

    /// Returns true while the job is still working
    pub fn is_running(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true for the two successful terminal states
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::CompletedWithErrors)
    }

    /// Whether moving from `self` to `next` keeps the job moving forward
    ///
    /// Staying in the same running state is allowed; leaving a terminal
    /// state or moving to an earlier stage is not.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() >= self.rank()
    }

    /// String form used in status payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::SubdomainsDiscovered => "subdomains_discovered",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its payload string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "started" => Some(Self::Started),
            "subdomains_discovered" => Some(Self::SubdomainsDiscovered),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "completed_with_errors" => Some(Self::CompletedWithErrors),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all job statuses in pipeline order
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Started,
            Self::SubdomainsDiscovered,
            Self::Processing,
            Self::Completed,
            Self::CompletedWithErrors,
            Self::Failed,
        ]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!JobStatus::Started.is_terminal());
        assert!(!JobStatus::SubdomainsDiscovered.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());

        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::CompletedWithErrors.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_is_success() {
        assert!(JobStatus::Completed.is_success());
        assert!(JobStatus::CompletedWithErrors.is_success());
        assert!(!JobStatus::Failed.is_success());
        assert!(!JobStatus::Processing.is_success());
    }

    #[test]
    fn test_forward_transitions() {
        assert!(JobStatus::Started.can_transition_to(JobStatus::SubdomainsDiscovered));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::SubdomainsDiscovered.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::SubdomainsDiscovered));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Started));
        assert!(!JobStatus::SubdomainsDiscovered.can_transition_to(JobStatus::Started));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [
            JobStatus::Completed,
            JobStatus::CompletedWithErrors,
            JobStatus::Failed,
        ] {
            for next in JobStatus::all_states() {
                assert!(
                    !terminal.can_transition_to(next),
                    "{} -> {} should be rejected",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn test_string_roundtrip() {
        for state in JobStatus::all_states() {
            assert_eq!(JobStatus::parse(state.as_str()), Some(state));
        }
        assert_eq!(JobStatus::parse("running"), None);
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::CompletedWithErrors).unwrap();
        assert_eq!(json, "\"completed_with_errors\"");
    }
}
