//! refresh-worker — scheduler process for recurring knowledge refreshes.
//!
//! Polls the scheduled-update store on a fixed tick, claims due records,
//! and runs refresh passes against the content registry. Store and
//! registry are the JSON-file backends under `--data-dir`; deployments
//! with a relational store plug their own implementations into
//! [`SchedulerPoller`] instead.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Notify;
use tracing::info;
use tracing_subscriber::EnvFilter;

use refresh_core::config::{load_dotenv, RefreshConfig};
use refresh_scheduler::file_store::{FileRegistry, FileStore};
use refresh_scheduler::{ExecutionEngine, SchedulerPoller};

/// Recurring knowledge-refresh scheduler worker.
///
/// Settings come from [`RefreshConfig::from_env`]; flags override.
#[derive(Parser, Debug)]
#[command(name = "refresh-worker", version, about)]
struct Cli {
    /// Directory holding scheduled-updates.json and content-bases.json.
    #[arg(long)]
    data_dir: Option<String>,

    /// Seconds between scheduler ticks.
    #[arg(long)]
    tick_interval: Option<u64>,

    /// Per-item refresh timeout in seconds.
    #[arg(long)]
    item_timeout: Option<u64>,
}

impl Cli {
    fn into_config(self) -> RefreshConfig {
        let mut config = RefreshConfig::from_env();
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir.into();
        }
        if let Some(secs) = self.tick_interval {
            config.tick_interval_secs = secs;
        }
        if let Some(secs) = self.item_timeout {
            config.item_timeout_secs = secs;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config();
    info!(
        data_dir = %config.data_dir.display(),
        tick_interval = config.tick_interval_secs,
        "starting refresh worker"
    );

    let store = Arc::new(FileStore::new(&config.data_dir));
    let registry = Arc::new(FileRegistry::new(&config.data_dir));
    let engine = ExecutionEngine::new(registry, Duration::from_secs(config.item_timeout_secs));
    let poller = SchedulerPoller::new(
        store,
        engine,
        Duration::from_secs(config.tick_interval_secs),
    );

    let shutdown = Arc::new(Notify::new());
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c received, shutting down");
                shutdown.notify_waiters();
            }
        });
    }

    poller.run(shutdown).await;
    info!("refresh worker stopped");
    Ok(())
}
