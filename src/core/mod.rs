pub mod job;
pub mod orchestrator;
pub mod registry;
pub mod status;
pub mod target;
pub mod tree;

pub use job::ArchiveJob;
pub use orchestrator::{ArchiveEvent, Orchestrator};
pub use registry::{BackendDescriptor, BackendRegistry};
pub use status::{JobStatus, TargetStatus};
pub use target::ArchiveTarget;
pub use tree::{AggregationPolicy, ArchiveTree, ChildAggregation, FailureScope};
