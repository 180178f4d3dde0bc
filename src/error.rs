use thiserror::Error;

/// Errors surfaced by the archive tree tracker.
///
/// All of these indicate an integration mistake by the caller rather
/// than a retryable condition; the tracker itself never talks to a
/// backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArchiveError {
    #[error("no archive job for node '{node}'")]
    UnknownNode { node: String },

    #[error("no archive target named '{backend}' on node '{node}'")]
    UnknownTarget { node: String, backend: String },

    #[error("node '{node}' already has an archive job")]
    DuplicateJob { node: String },

    #[error("parent node '{parent}' has no archive job")]
    UnknownParent { parent: String },
}
