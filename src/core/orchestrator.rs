//! Event loop applying orchestrator reports to the archive tree.
//!
//! The tracker never calls a backend itself; an external orchestrator
//! reports what happened and this loop folds those reports into the
//! tree, persisting each affected job. Consuming events from a single
//! mpsc receiver serializes updates, which is the component's
//! single-writer assumption.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::core::registry::BackendRegistry;
use crate::core::status::TargetStatus;
use crate::core::tree::ArchiveTree;
use crate::db;

/// One report from the external orchestrator, as carried on the wire
/// (and in replay files, one JSON object per line).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArchiveEvent {
    /// Archival began for one node: register its job and enumerate its
    /// targets. Events may carry their own backend list; otherwise the
    /// configured registry applies.
    JobCreated {
        src_node: String,
        dst_node: String,
        initiator: String,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        backends: Option<BackendRegistry>,
    },
    /// A storage backend finished (or failed) for one node.
    TargetReport {
        dst_node: String,
        backend: String,
        status: TargetStatus,
        #[serde(default)]
        stat_result: Option<Value>,
        #[serde(default)]
        errors: Option<Vec<String>>,
    },
}

pub struct Orchestrator {
    ctx: AppContext,
    tree: ArchiveTree,
}

impl Orchestrator {
    pub fn new(ctx: AppContext) -> Self {
        let tree = ArchiveTree::new(ctx.config.aggregation);
        Self { ctx, tree }
    }

    /// Consume events until the channel closes, then return the final tree.
    pub async fn run(mut self, mut rx: mpsc::Receiver<ArchiveEvent>) -> Result<ArchiveTree> {
        while let Some(event) = rx.recv().await {
            self.handle_event(event).await?;
        }
        Ok(self.tree)
    }

    pub async fn handle_event(&mut self, event: ArchiveEvent) -> Result<()> {
        match event {
            ArchiveEvent::JobCreated {
                src_node,
                dst_node,
                initiator,
                parent,
                backends,
            } => {
                self.handle_job_created(src_node, dst_node, initiator, parent, backends)
                    .await
            }
            ArchiveEvent::TargetReport {
                dst_node,
                backend,
                status,
                stat_result,
                errors,
            } => {
                self.handle_target_report(dst_node, backend, status, stat_result, errors)
                    .await
            }
        }
    }

    async fn handle_job_created(
        &mut self,
        src_node: String,
        dst_node: String,
        initiator: String,
        parent: Option<String>,
        backends: Option<BackendRegistry>,
    ) -> Result<()> {
        let backends = backends.as_ref().unwrap_or(&self.ctx.config.backends);
        self.tree
            .add_job(&src_node, &dst_node, &initiator, parent.as_deref())
            .with_context(|| format!("registering archive job for node {dst_node}"))?;
        self.tree
            .set_targets(&dst_node, backends)
            .with_context(|| format!("enumerating targets for node {dst_node}"))?;

        let job = self.tree.job(&dst_node)?;
        info!(
            %dst_node,
            %src_node,
            %initiator,
            targets = job.targets.len(),
            "archive job created"
        );
        db::jobs::create(&self.ctx.db, job, parent.as_deref())
            .await
            .context("persisting new archive job")?;
        Ok(())
    }

    async fn handle_target_report(
        &mut self,
        dst_node: String,
        backend: String,
        status: TargetStatus,
        stat_result: Option<Value>,
        errors: Option<Vec<String>>,
    ) -> Result<()> {
        if let Err(err) = self
            .tree
            .update_target(&dst_node, &backend, status, stat_result, errors)
        {
            // An unknown target is an integration bug upstream; record it
            // and keep consuming sibling reports.
            warn!(%dst_node, %backend, %err, "dropping target report");
            return Ok(());
        }

        // Persist the reported job and every ancestor the aggregation
        // pass touched, whether or not a verdict changed.
        let affected: Vec<String> = self
            .tree
            .self_and_ancestors(&dst_node)?
            .iter()
            .map(|j| j.dst_node.clone())
            .collect();
        for node in affected {
            let job = self.tree.job(&node)?;
            db::jobs::update(&self.ctx.db, job)
                .await
                .with_context(|| format!("persisting archive job for node {node}"))?;
        }

        let job = self.tree.job(&dst_node)?;
        info!(
            %dst_node,
            %backend,
            status = %status,
            done = job.done,
            job_status = %job.status,
            "target report applied"
        );
        Ok(())
    }

    pub fn tree(&self) -> &ArchiveTree {
        &self.tree
    }
}
