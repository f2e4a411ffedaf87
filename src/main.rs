use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use workbench::cli::{Cli, Commands};
use workbench::config;
use workbench::console::{self, HeadlessOptions};
use workbench::ledger::audit::AuditLog;
use workbench::orchestration::{FixedPlanner, Workbench};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for console output and --json.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!("Workbench starting");

    let config = config::load_config(&cli)?;
    tracing::info!(
        approval_required = config.approval_required,
        delays_ms = ?config.completion_delays_ms,
        "Config loaded"
    );

    let planner = Arc::new(FixedPlanner::from_millis(&config.completion_delays_ms));
    let mut workbench = Workbench::new(&config, planner);
    if let Some(path) = &config.audit_log_path {
        let log = AuditLog::open(path)
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;
        tracing::info!(path = %path.display(), "Audit log enabled");
        workbench = workbench.with_audit_log(log);
    }

    match cli.command {
        Commands::Run {
            prompt,
            reject,
            stop_after_ms,
            save_all,
            json,
            ..
        } => {
            let options = HeadlessOptions {
                reject,
                stop_after: stop_after_ms.map(Duration::from_millis),
                save_all,
                json,
            };
            console::run_headless(workbench, &prompt, options).await?;
        }
        Commands::Console { .. } => {
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            console::run_console(workbench.with_events(tx), rx).await?;
        }
    }

    Ok(())
}
