//! arkivd — archive-tree status tracker.
//!
//! Tracks the archival of a tree of nodes: one job per node, one target
//! per storage backend, with node completion and the tree-wide
//! success/failure verdict aggregated bottom-up after every report.

pub mod config;
pub mod context;
pub mod core;
pub mod db;
pub mod error;
pub mod logging;

pub use error::ArchiveError;
