//! One storage backend's archival record within a job.

use serde_json::Value;
use uuid::Uuid;

use super::status::TargetStatus;

/// Archival status of a single storage backend for one node.
///
/// Created when the owning job enumerates its backends; mutated only
/// through `ArchiveTree::update_target`; never deleted while the job
/// exists.
#[derive(Debug, Clone)]
pub struct ArchiveTarget {
    pub id: String,
    /// Backend name, unique within the owning job under normal use.
    pub name: String,
    pub status: TargetStatus,
    /// Last statistics snapshot reported by the backend. Opaque here.
    pub stat_result: Value,
    /// Ordered error messages; populated only alongside a failure status.
    pub errors: Vec<String>,
}

impl ArchiveTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.into(),
            status: TargetStatus::Initiated,
            stat_result: Value::Object(serde_json::Map::new()),
            errors: Vec::new(),
        }
    }
}
