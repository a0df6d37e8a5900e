//! ticktrack CLI - live elapsed-time readout for the active entry.

mod surface;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use ticktrack_core::{ProjectRef, UserId};
use ticktrack_runtime::ModelPorts;
use ticktrack_storage::{EntryStore, LocalBus, StaticIdentity};
use ticktrack_timer::{Strategy, TimerConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::surface::TerminalSurface;

#[derive(Parser)]
#[command(name = "ticktrack")]
#[command(about = "Live elapsed-time readout for the active time entry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an entry and watch the readout until it is stopped
    Watch {
        /// Seconds to track before stopping the entry
        #[arg(long, default_value = "5")]
        seconds: u64,
        /// Observation strategy (manager or bus)
        #[arg(long)]
        strategy: Option<Strategy>,
        /// Show project and description labels
        #[arg(long)]
        compact: bool,
        /// Entry description
        #[arg(long, default_value = "")]
        description: String,
        /// Project name
        #[arg(long)]
        project: Option<String>,
        /// Tracking user
        #[arg(long, default_value = "me")]
        user: String,
        /// Config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the entries to this file when done
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Print the effective configuration
    ShowConfig {
        /// Config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            seconds,
            strategy,
            compact,
            description,
            project,
            user,
            config,
            save,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(strategy) = strategy {
                config.strategy = strategy;
            }
            config.compact |= compact;

            watch(config, seconds, description, project, UserId::new(user), save).await?;
        }
        Commands::ShowConfig { config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<TimerConfig> {
    match path {
        Some(path) => TimerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(TimerConfig::default()),
    }
}

async fn watch(
    config: TimerConfig,
    seconds: u64,
    description: String,
    project: Option<String>,
    viewer: UserId,
    save: Option<PathBuf>,
) -> Result<()> {
    let bus = Arc::new(LocalBus::new());
    let store = Arc::new(EntryStore::new(viewer.clone(), bus.clone()));
    let model = ModelPorts::local(store.clone(), bus, StaticIdentity::new(viewer.clone()));

    let (handle, task) = ticktrack_runtime::spawn(config, model);
    let mut changes = handle.subscribe_entry_changes().await?;
    handle.start(Box::new(TerminalSurface::stdout())).await?;

    let entry = store.start_entry(viewer, description, project.map(ProjectRef::new), Utc::now());
    info!(entry_id = %entry.id, seconds, "tracking");

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    handle.request_stop().await?;
    let snapshot = handle.snapshot().await?;
    info!(display = %snapshot.display, "entry stopped");

    handle.shutdown().await?;
    task.await.context("dispatcher task failed")?;

    while let Ok(change) = changes.try_recv() {
        debug!(entry = ?change.entry, "identity change");
    }

    if let Some(path) = save {
        store.save(&path).await?;
        println!("Saved entries to {}", path.display());
    }

    Ok(())
}
