use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use tokio_rusqlite::{Connection, params, rusqlite};
use uuid::Uuid;

use crate::core::{ArchiveJob, ArchiveTarget};

/// A job row as reloaded from storage, with its tree link.
#[derive(Debug, Clone)]
pub struct StoredJob {
    pub job: ArchiveJob,
    pub parent_node: Option<String>,
}

pub async fn create(conn: &Connection, job: &ArchiveJob, parent: Option<&str>) -> Result<()> {
    let job = job.clone();
    let parent = parent.map(str::to_string);
    let target_rows = target_rows(&job)?;

    conn.call(move |c| {
        let tx = c.transaction()?;

        tx.execute(
            "INSERT INTO archive_jobs
             (id, src_node, dst_node, parent_node, initiator, status, done, sent, datetime_initiated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &job.id,
                &job.src_node,
                &job.dst_node,
                &parent,
                &job.initiator,
                job.status.as_str(),
                job.done,
                job.sent,
                job.datetime_initiated.to_rfc3339(),
            ],
        )?;

        for row in &target_rows {
            insert_target(&tx, &job.id, row)?;
        }

        let log_id = Uuid::now_v7().to_string();
        tx.execute(
            "INSERT INTO job_status_log (id, job_id, status, done)
             VALUES (?1, ?2, ?3, ?4)",
            params![log_id, &job.id, job.status.as_str(), job.done],
        )?;

        tx.commit()?;
        Ok::<(), rusqlite::Error>(())
    })
    .await
    .map_err(|e| anyhow!("Failed to create archive job: {}", e))
}

/// Write back a job after an aggregation pass. Targets are upserted by
/// id so a repeated `set_targets` batch lands as new rows, and a status
/// log entry is appended on every call even when the verdict is
/// unchanged.
pub async fn update(conn: &Connection, job: &ArchiveJob) -> Result<()> {
    let job = job.clone();
    let target_rows = target_rows(&job)?;

    conn.call(move |c| {
        let tx = c.transaction()?;

        tx.execute(
            "UPDATE archive_jobs SET status = ?2, done = ?3, sent = ?4 WHERE id = ?1",
            params![&job.id, job.status.as_str(), job.done, job.sent],
        )?;

        for row in &target_rows {
            insert_target(&tx, &job.id, row)?;
        }

        let log_id = Uuid::now_v7().to_string();
        tx.execute(
            "INSERT INTO job_status_log (id, job_id, status, done)
             VALUES (?1, ?2, ?3, ?4)",
            params![log_id, &job.id, job.status.as_str(), job.done],
        )?;

        tx.commit()?;
        Ok::<(), rusqlite::Error>(())
    })
    .await
    .map_err(|e| anyhow!("Failed to update archive job: {}", e))
}

/// Reload every job with its targets, parents before children.
pub async fn load_all(conn: &Connection) -> Result<Vec<StoredJob>> {
    let raw = conn
        .call(|c| {
            let mut stmt = c.prepare(
                "SELECT id, src_node, dst_node, parent_node, initiator,
                        status, done, sent, datetime_initiated
                 FROM archive_jobs ORDER BY rowid",
            )?;
            let jobs: Vec<RawJob> = stmt
                .query_map([], |row| {
                    Ok(RawJob {
                        id: row.get(0)?,
                        src_node: row.get(1)?,
                        dst_node: row.get(2)?,
                        parent_node: row.get(3)?,
                        initiator: row.get(4)?,
                        status: row.get(5)?,
                        done: row.get(6)?,
                        sent: row.get(7)?,
                        datetime_initiated: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<_, _>>()?;

            let mut stmt = c.prepare(
                "SELECT id, job_id, name, status, stat_result, errors
                 FROM archive_targets ORDER BY rowid",
            )?;
            let targets: Vec<RawTarget> = stmt
                .query_map([], |row| {
                    Ok(RawTarget {
                        id: row.get(0)?,
                        job_id: row.get(1)?,
                        name: row.get(2)?,
                        status: row.get(3)?,
                        stat_result: row.get(4)?,
                        errors: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<_, _>>()?;

            Ok::<_, rusqlite::Error>((jobs, targets))
        })
        .await
        .map_err(|e| anyhow!("Failed to load archive jobs: {}", e))?;

    let (raw_jobs, raw_targets) = raw;
    let mut out = Vec::with_capacity(raw_jobs.len());
    for raw_job in raw_jobs {
        let targets = raw_targets
            .iter()
            .filter(|t| t.job_id == raw_job.id)
            .map(RawTarget::parse)
            .collect::<Result<Vec<_>>>()?;
        out.push(raw_job.parse(targets)?);
    }
    Ok(out)
}

struct RawJob {
    id: String,
    src_node: String,
    dst_node: String,
    parent_node: Option<String>,
    initiator: String,
    status: String,
    done: bool,
    sent: bool,
    datetime_initiated: String,
}

impl RawJob {
    fn parse(self, targets: Vec<ArchiveTarget>) -> Result<StoredJob> {
        let status = self
            .status
            .parse()
            .map_err(|e: String| anyhow!(e))
            .with_context(|| format!("job {}", self.id))?;
        let datetime_initiated = DateTime::parse_from_rfc3339(&self.datetime_initiated)
            .with_context(|| format!("job {} timestamp", self.id))?
            .with_timezone(&Utc);
        Ok(StoredJob {
            job: ArchiveJob {
                id: self.id,
                src_node: self.src_node,
                dst_node: self.dst_node,
                initiator: self.initiator,
                datetime_initiated,
                status,
                done: self.done,
                sent: self.sent,
                targets,
            },
            parent_node: self.parent_node,
        })
    }
}

struct RawTarget {
    id: String,
    job_id: String,
    name: String,
    status: String,
    stat_result: String,
    errors: String,
}

impl RawTarget {
    fn parse(&self) -> Result<ArchiveTarget> {
        let status = self
            .status
            .parse()
            .map_err(|e: String| anyhow!(e))
            .with_context(|| format!("target {}", self.id))?;
        Ok(ArchiveTarget {
            id: self.id.clone(),
            name: self.name.clone(),
            status,
            stat_result: serde_json::from_str(&self.stat_result)
                .with_context(|| format!("target {} stats", self.id))?,
            errors: serde_json::from_str(&self.errors)
                .with_context(|| format!("target {} errors", self.id))?,
        })
    }
}

struct TargetRow {
    id: String,
    name: String,
    status: &'static str,
    stat_result: String,
    errors: String,
}

fn target_rows(job: &ArchiveJob) -> Result<Vec<TargetRow>> {
    job.targets
        .iter()
        .map(|t| {
            Ok(TargetRow {
                id: t.id.clone(),
                name: t.name.clone(),
                status: t.status.as_str(),
                stat_result: serde_json::to_string(&t.stat_result)?,
                errors: serde_json::to_string(&t.errors)?,
            })
        })
        .collect()
}

fn insert_target(
    tx: &rusqlite::Transaction<'_>,
    job_id: &str,
    row: &TargetRow,
) -> std::result::Result<usize, rusqlite::Error> {
    tx.execute(
        "INSERT INTO archive_targets (id, job_id, name, status, stat_result, errors)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            stat_result = excluded.stat_result,
            errors = excluded.errors",
        params![&row.id, job_id, &row.name, row.status, &row.stat_result, &row.errors],
    )
}
