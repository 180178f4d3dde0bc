//! Storage backend descriptors.
//!
//! The set of backends a node can archive from is explicit configuration
//! handed to `set_targets`, not a global setting. A backend contributes
//! an archive target only when it is fully configured and is actually a
//! storage backend (citation services and the like are skipped).

use serde::{Deserialize, Serialize};

/// Capability-tagged description of one configured backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub name: String,
    /// Whether the backend's connection is fully set up for the node.
    #[serde(default = "default_true")]
    pub configured: bool,
    /// Whether the backend stores files (as opposed to e.g. citations).
    #[serde(default = "default_true")]
    pub supports_storage: bool,
}

fn default_true() -> bool {
    true
}

impl BackendDescriptor {
    pub fn storage(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configured: true,
            supports_storage: true,
        }
    }
}

/// The backends configured for a node, in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendRegistry {
    pub backends: Vec<BackendDescriptor>,
}

impl BackendRegistry {
    pub fn new(backends: Vec<BackendDescriptor>) -> Self {
        Self { backends }
    }

    /// Names of the backends eligible for archival.
    pub fn archivable(&self) -> impl Iterator<Item = &str> {
        self.backends
            .iter()
            .filter(|b| b.configured && b.supports_storage)
            .map(|b| b.name.as_str())
    }
}
