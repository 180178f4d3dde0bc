//! The archival job for a single node.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::status::JobStatus;
use super::target::ArchiveTarget;

/// Tracked archival task for exactly one node.
///
/// A job is a historical record: it is created once, its targets are
/// attached once, and it is never deleted. Tree links live in the
/// owning `ArchiveTree` arena, keyed by destination node id.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    pub id: String,
    /// Node being copied from.
    pub src_node: String,
    /// New node being archived into. Keys the job in the tree.
    pub dst_node: String,
    /// User who initiated the archival.
    pub initiator: String,
    pub datetime_initiated: DateTime<Utc>,
    pub status: JobStatus,
    /// True once every owned target has reached a terminal status.
    pub done: bool,
    /// Whether the downstream notification for this job has fired.
    pub sent: bool,
    pub targets: Vec<ArchiveTarget>,
}

impl ArchiveJob {
    pub fn new(
        src_node: impl Into<String>,
        dst_node: impl Into<String>,
        initiator: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            src_node: src_node.into(),
            dst_node: dst_node.into(),
            initiator: initiator.into(),
            datetime_initiated: Utc::now(),
            status: JobStatus::Initiated,
            done: false,
            sent: false,
            targets: Vec::new(),
        }
    }

    /// The node is target-complete when no owned target is still pending.
    /// A job with zero targets is complete by definition.
    pub fn node_finished(&self) -> bool {
        self.targets.iter().all(|t| t.status.is_terminal())
    }

    /// Whether any of this job's own targets carries a failure status.
    pub fn has_failed_target(&self) -> bool {
        self.targets.iter().any(|t| t.status.is_failure())
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    /// Ordered union of error messages from this job's failing targets.
    pub fn target_errors(&self) -> Vec<String> {
        self.targets
            .iter()
            .filter(|t| t.status.is_failure())
            .flat_map(|t| t.errors.iter().cloned())
            .collect()
    }

    /// (source node, destination node, initiating user).
    pub fn info(&self) -> (&str, &str, &str) {
        (&self.src_node, &self.dst_node, &self.initiator)
    }
}
