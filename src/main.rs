use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arkivd::core::{ArchiveEvent, Orchestrator};
use arkivd::db::jobs::StoredJob;
use arkivd::{config, context, db, logging};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "arkivd")]
#[command(about = "Archive tree status tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a recorded stream of orchestrator events and persist the result
    Replay(ReplayArgs),
    /// Print the persisted archive job tree
    Status(StatusArgs),
}

#[derive(Args, Serialize)]
struct ReplayArgs {
    /// Events file, one JSON event per line
    #[serde(skip)]
    events: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    database_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    json_logs: Option<bool>,
}

#[derive(Args, Serialize)]
struct StatusArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    database_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Replay(args) => {
            let config = config::AppConfig::new(Some(args))?;
            logging::init(logging::LogConfig {
                json: config.json_logs,
                verbose: config.verbose,
            });
            let db_conn = db::init(&config.database_path).await?;
            let ctx = context::AppContext::new(config, db_conn);
            run_replay(ctx, &args.events)
                .await
                .context("Failed to replay events")?
        }
        Commands::Status(args) => {
            let config = config::AppConfig::new(Some(args))?;
            let db_conn = db::init(&config.database_path).await?;
            run_status(&db_conn)
                .await
                .context("Failed to read job status")?
        }
    }

    Ok(())
}

async fn run_replay(ctx: context::AppContext, path: &Path) -> Result<()> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let events = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).with_context(|| format!("parsing event: {line}")))
        .collect::<Result<Vec<ArchiveEvent>>>()?;

    let (tx, rx) = mpsc::channel(events.len().max(1));
    for event in events {
        tx.send(event).await?;
    }
    drop(tx);

    let tree = Orchestrator::new(ctx).run(rx).await?;
    for job in tree.jobs() {
        println!(
            "{}  status={} done={}",
            job.dst_node, job.status, job.done
        );
    }
    Ok(())
}

async fn run_status(conn: &tokio_rusqlite::Connection) -> Result<()> {
    let stored = db::jobs::load_all(conn).await?;
    if stored.is_empty() {
        println!("No archive jobs recorded.");
        return Ok(());
    }

    let roots: Vec<&StoredJob> = stored.iter().filter(|s| s.parent_node.is_none()).collect();
    for root in roots {
        print_subtree(&stored, root, 0);
    }
    Ok(())
}

fn print_subtree(all: &[StoredJob], node: &StoredJob, depth: usize) {
    let targets: Vec<String> = node
        .job
        .targets
        .iter()
        .map(|t| format!("{}={}", t.name, t.status))
        .collect();
    println!(
        "{:indent$}{}  status={} done={} sent={}  [{}]",
        "",
        node.job.dst_node,
        node.job.status,
        node.job.done,
        node.job.sent,
        targets.join(", "),
        indent = depth * 2
    );
    for child in all
        .iter()
        .filter(|s| s.parent_node.as_deref() == Some(node.job.dst_node.as_str()))
    {
        print_subtree(all, child, depth + 1);
    }
}
