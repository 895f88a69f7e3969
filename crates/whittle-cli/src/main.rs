//! Whittle - oracle-driven test-case reduction.
//!
//! # Usage
//!
//! ```bash
//! whittle --query 'cc -c @FILE 2>&1 | grep -c "internal error"' \
//!         --reduce 'delete-chunk @SEED < @FILE' \
//!         --count 'count-chunks < @FILE' \
//!         crash.c
//! ```
//!
//! Every generation is kept under the output directory (`./WHITTLED` by
//! default); the minimized artifact lands in `<stem>.whittled<ext>`.

mod args;
mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use whittle_core::progress::ProgressSummary;
use whittle_core::{whittle, CancelToken, SearchOutcome, ShellOracle, WhittleConfig};

use args::CliArgs;
use status::StatusReporter;

/// JSON report written by `--report`.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    input: &'a PathBuf,
    config: &'a WhittleConfig,
    outcome: &'a SearchOutcome,
    progress: ProgressSummary,
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.verbose, args.json_logs);

    info!(version = env!("CARGO_PKG_VERSION"), "whittle");

    let config = args.to_config()?;
    let input = args.input.clone();

    let cancel = CancelToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; stopping after the current stage");
                cancel.cancel();
            }
        }
    });

    let search = tokio::task::spawn_blocking({
        let config = config.clone();
        let input = input.clone();
        move || {
            let mut reporter = StatusReporter::new();
            let oracle = ShellOracle::new(config.shell.clone());
            whittle(&input, &config, oracle, cancel, &mut reporter)
                .map(|outcome| (outcome, reporter.into_summary()))
        }
    });

    let (outcome, progress) = search.await.context("search worker panicked")??;

    if let Some(path) = &args.report {
        let report = RunReport {
            input: &input,
            config: &config,
            outcome: &outcome,
            progress,
        };
        let json = serde_json::to_string_pretty(&report).context("cannot serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("cannot write report {}", path.display()))?;
    }

    match &outcome.final_artifact {
        Some(path) => {
            println!("Done whittling ({}).", outcome.stop_reason);
            println!("{}", path.display());
        }
        None if outcome.current_generation > 0 => {
            println!("Stopped whittling ({}).", outcome.stop_reason);
            println!("last accepted: {}", outcome.last_accepted.display());
        }
        None => println!("No reduction found ({}).", outcome.stop_reason),
    }
    Ok(())
}
