//! Status state machines for archive targets and jobs.
//!
//! `Initiated` is the only non-terminal state. No transition leaves a
//! terminal state as far as the aggregation logic is concerned, although
//! the orchestrator may overwrite a terminal target report (see
//! `ArchiveTree::update_target`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a single storage backend's archival within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// Archival has started and no result has been reported yet.
    Initiated,
    /// The backend finished copying successfully.
    Success,
    /// Generic failure reported by the backend.
    Failure,
    /// The backend's content exceeded the allowed archive size.
    SizeExceeded,
    /// The backend could not be reached.
    NetworkError,
    /// A file disappeared between enumeration and copy.
    FileNotFound,
    /// The orchestrator hit an unexpected error while archiving.
    UncaughtError,
    /// An operator aborted the archival.
    ForcedFailure,
}

impl TargetStatus {
    /// True once the backend has reported a final result.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Initiated)
    }

    /// True for every failure kind.
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && !matches!(self, Self::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::SizeExceeded => "size_exceeded",
            Self::NetworkError => "network_error",
            Self::FileNotFound => "file_not_found",
            Self::UncaughtError => "uncaught_error",
            Self::ForcedFailure => "forced_failure",
        }
    }
}

impl FromStr for TargetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(Self::Initiated),
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "size_exceeded" => Ok(Self::SizeExceeded),
            "network_error" => Ok(Self::NetworkError),
            "file_not_found" => Ok(Self::FileNotFound),
            "uncaught_error" => Ok(Self::UncaughtError),
            "forced_failure" => Ok(Self::ForcedFailure),
            other => Err(format!("unknown target status: {other}")),
        }
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Projected status of a whole job.
///
/// Stays `Initiated` until the job's subtree is tree-finished, then
/// resolves to `Success` or `Failure` exactly once per aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Initiated,
    Success,
    Failure,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(Self::Initiated),
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initiated_is_the_only_non_terminal_state() {
        let all = [
            TargetStatus::Initiated,
            TargetStatus::Success,
            TargetStatus::Failure,
            TargetStatus::SizeExceeded,
            TargetStatus::NetworkError,
            TargetStatus::FileNotFound,
            TargetStatus::UncaughtError,
            TargetStatus::ForcedFailure,
        ];
        for status in all {
            assert_eq!(
                status.is_terminal(),
                status != TargetStatus::Initiated,
                "{status}"
            );
        }
    }

    #[test]
    fn success_is_not_a_failure() {
        assert!(!TargetStatus::Success.is_failure());
        assert!(!TargetStatus::Initiated.is_failure());
        assert!(TargetStatus::NetworkError.is_failure());
        assert!(TargetStatus::ForcedFailure.is_failure());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for s in ["initiated", "success", "size_exceeded", "forced_failure"] {
            let status: TargetStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!("finished".parse::<TargetStatus>().is_err());
    }
}
