//! jobsched-demo — a small CLI harness that exercises [`jobsched::Engine`]
//! end-to-end for manual smoke testing.
//!
//! This is *not* the out-of-scope HTTP façade `spec.md` §1 names as an
//! external collaborator: it takes its schedule straight from flags instead
//! of an HTTP POST, and it has no URL-calling job action or log sink. It
//! exists purely so the engine's control surface can be watched firing in a
//! terminal.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use tracing::info;

use jobsched::{Engine, FuncJob};

/// Drive a jobsched [`Engine`] from the command line.
#[derive(Parser, Debug)]
#[command(name = "jobsched-demo", version, about)]
struct Cli {
    /// A schedule spec to register: a descriptor (`@hourly`), a fixed
    /// interval (`@every 2s`), or a six-field cron expression.
    #[arg(long, default_value = "@every 2s")]
    cron: String,

    /// Also register a one-shot job this many seconds from now. Omit to
    /// skip the one-shot entry.
    #[arg(long)]
    once_in: Option<u64>,

    /// How long to let the engine run before stopping, in seconds.
    #[arg(long, default_value_t = 15)]
    run_for: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let engine = Engine::new();

    let id = engine
        .add_func(&cli.cron, |id| {
            info!(entry_id = id, "fired");
        })
        .await?;
    info!(entry_id = id, spec = %cli.cron, "registered recurring entry");

    if let Some(secs) = cli.once_in {
        let at = Local::now() + chrono::Duration::seconds(secs as i64);
        let once_id = engine
            .add_once_job(
                at,
                Arc::new(FuncJob(|id| {
                    info!(entry_id = id, "one-shot fired");
                })),
            )
            .await;
        info!(entry_id = once_id, at = %at, "registered one-shot entry");
    }

    engine.start();
    info!(run_for_secs = cli.run_for, "engine started");

    tokio::time::sleep(Duration::from_secs(cli.run_for)).await;

    let snapshot = engine.entries().await;
    info!(remaining = snapshot.len(), "run complete; remaining entries");
    for entry in &snapshot {
        info!(
            id = entry.id,
            next = ?entry.next,
            prev = ?entry.prev,
            "entry"
        );
    }

    engine.stop().await;
    info!("engine stopped");
    Ok(())
}
