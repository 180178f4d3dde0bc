//! The archive tree: one job per node, aggregated bottom-up.
//!
//! Jobs live in an arena indexed by destination node id, mirroring the
//! node hierarchy being archived. Every target report triggers an
//! aggregation pass over the reported job and each of its ancestors, so
//! a parent that finished its own targets early still resolves once its
//! descendants catch up.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::job::ArchiveJob;
use super::registry::BackendRegistry;
use super::status::{JobStatus, TargetStatus};
use super::target::ArchiveTarget;
use crate::error::ArchiveError;

/// How a job's tree-finished check combines its children's results.
///
/// The historical behavior is `AnyFinished`: a job with children counts
/// as tree-finished as soon as one child subtree is. `AllFinished` is
/// the stricter reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildAggregation {
    #[default]
    AnyFinished,
    AllFinished,
}

/// Which targets decide a resolved job's success-or-failure verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureScope {
    /// Any failing target anywhere in the subtree fails the job.
    #[default]
    Subtree,
    /// Only the job's own targets decide.
    OwnTargets,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AggregationPolicy {
    #[serde(default)]
    pub child_aggregation: ChildAggregation,
    #[serde(default)]
    pub failure_scope: FailureScope,
}

struct JobNode {
    job: ArchiveJob,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Arena of archive jobs keyed by destination node id.
pub struct ArchiveTree {
    policy: AggregationPolicy,
    nodes: Vec<JobNode>,
    index: HashMap<String, usize>,
}

impl ArchiveTree {
    pub fn new(policy: AggregationPolicy) -> Self {
        Self {
            policy,
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// Register the job for one node. `parent` is the destination node id
    /// of the parent job, which must already be registered.
    pub fn add_job(
        &mut self,
        src_node: impl Into<String>,
        dst_node: impl Into<String>,
        initiator: impl Into<String>,
        parent: Option<&str>,
    ) -> Result<(), ArchiveError> {
        let dst_node = dst_node.into();
        if self.index.contains_key(&dst_node) {
            return Err(ArchiveError::DuplicateJob { node: dst_node });
        }
        let parent_idx = match parent {
            Some(p) => Some(*self.index.get(p).ok_or_else(|| ArchiveError::UnknownParent {
                parent: p.to_string(),
            })?),
            None => None,
        };

        let idx = self.nodes.len();
        self.nodes.push(JobNode {
            job: ArchiveJob::new(src_node, dst_node.clone(), initiator),
            parent: parent_idx,
            children: Vec::new(),
        });
        if let Some(p) = parent_idx {
            self.nodes[p].children.push(idx);
        }
        self.index.insert(dst_node, idx);
        Ok(())
    }

    pub fn job(&self, dst_node: &str) -> Result<&ArchiveJob, ArchiveError> {
        self.lookup(dst_node).map(|idx| &self.nodes[idx].job)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All jobs in insertion order. Parents were necessarily inserted
    /// before their children.
    pub fn jobs(&self) -> impl Iterator<Item = &ArchiveJob> {
        self.nodes.iter().map(|n| &n.job)
    }

    /// The job for `dst_node` followed by each ancestor up to the root.
    /// This is exactly the set a target report can change.
    pub fn self_and_ancestors(&self, dst_node: &str) -> Result<Vec<&ArchiveJob>, ArchiveError> {
        let mut idx = Some(self.lookup(dst_node)?);
        let mut out = Vec::new();
        while let Some(i) = idx {
            out.push(&self.nodes[i].job);
            idx = self.nodes[i].parent;
        }
        Ok(out)
    }

    /// Attach one target per archivable backend and mark the job
    /// initiated. Not idempotent: a second call appends another batch of
    /// targets for the same backends.
    pub fn set_targets(
        &mut self,
        dst_node: &str,
        registry: &BackendRegistry,
    ) -> Result<(), ArchiveError> {
        let idx = self.lookup(dst_node)?;
        let job = &mut self.nodes[idx].job;
        job.status = JobStatus::Initiated;
        for name in registry.archivable() {
            job.targets.push(ArchiveTarget::new(name));
        }
        // A job with zero targets is node-complete from the start, so the
        // aggregation pass runs here as well as after each report.
        self.aggregate_upward(idx);
        Ok(())
    }

    /// Record a backend's report, overwriting the matching target in
    /// place. A terminal target can be overwritten by a later report;
    /// repeated reports are last-writer-wins.
    pub fn update_target(
        &mut self,
        dst_node: &str,
        backend: &str,
        status: TargetStatus,
        stat_result: Option<Value>,
        errors: Option<Vec<String>>,
    ) -> Result<(), ArchiveError> {
        let idx = self.lookup(dst_node)?;
        let job = &mut self.nodes[idx].job;
        let target = job
            .targets
            .iter_mut()
            .find(|t| t.name == backend)
            .ok_or_else(|| ArchiveError::UnknownTarget {
                node: dst_node.to_string(),
                backend: backend.to_string(),
            })?;

        target.status = status;
        target.stat_result = stat_result.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        target.errors = errors.unwrap_or_default();

        self.aggregate_upward(idx);
        Ok(())
    }

    /// Whether the whole subtree rooted at `dst_node` has finished,
    /// under the configured child-aggregation policy.
    pub fn archive_tree_finished(&self, dst_node: &str) -> Result<bool, ArchiveError> {
        Ok(self.subtree_finished(self.lookup(dst_node)?))
    }

    /// Ordered union of error messages from failing targets across the
    /// subtree, parents before children.
    pub fn tree_errors(&self, dst_node: &str) -> Result<Vec<String>, ArchiveError> {
        let mut out = Vec::new();
        for idx in self.subtree_indices(self.lookup(dst_node)?) {
            out.extend(self.nodes[idx].job.target_errors());
        }
        Ok(out)
    }

    /// Flip the downstream-notification flag. Returns true only on the
    /// first call for a job, so the caller fires its trigger once.
    pub fn mark_sent(&mut self, dst_node: &str) -> Result<bool, ArchiveError> {
        let idx = self.lookup(dst_node)?;
        let job = &mut self.nodes[idx].job;
        let newly = !job.sent;
        job.sent = true;
        Ok(newly)
    }

    fn lookup(&self, dst_node: &str) -> Result<usize, ArchiveError> {
        self.index
            .get(dst_node)
            .copied()
            .ok_or_else(|| ArchiveError::UnknownNode {
                node: dst_node.to_string(),
            })
    }

    /// Recompute completion for the job at `idx` and every ancestor.
    /// The verdict is written on every pass, even when unchanged.
    fn aggregate_upward(&mut self, idx: usize) {
        let mut current = Some(idx);
        while let Some(i) = current {
            if self.nodes[i].job.node_finished() {
                self.nodes[i].job.done = true;
            }
            if self.subtree_finished(i) {
                let failed = match self.policy.failure_scope {
                    FailureScope::Subtree => self
                        .subtree_indices(i)
                        .into_iter()
                        .any(|j| self.nodes[j].job.has_failed_target()),
                    FailureScope::OwnTargets => self.nodes[i].job.has_failed_target(),
                };
                self.nodes[i].job.status = if failed {
                    JobStatus::Failure
                } else {
                    JobStatus::Success
                };
            }
            current = self.nodes[i].parent;
        }
    }

    /// Bottom-up fold over the subtree rooted at `root`.
    fn subtree_finished(&self, root: usize) -> bool {
        let order = self.subtree_indices(root);
        let mut finished: HashMap<usize, bool> = HashMap::with_capacity(order.len());

        // `order` is pre-order, so walking it in reverse sees every child
        // before its parent.
        for &idx in order.iter().rev() {
            let node = &self.nodes[idx];
            let result = if !node.job.node_finished() {
                false
            } else if node.children.is_empty() {
                true
            } else {
                let mut child_results = node.children.iter().map(|c| finished[c]);
                match self.policy.child_aggregation {
                    ChildAggregation::AnyFinished => child_results.any(|r| r),
                    ChildAggregation::AllFinished => child_results.all(|r| r),
                }
            };
            finished.insert(idx, result);
        }
        finished[&root]
    }

    /// Pre-order indices of the subtree rooted at `root`.
    fn subtree_indices(&self, root: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            out.push(idx);
            stack.extend(self.nodes[idx].children.iter().copied());
        }
        out
    }
}
