//! site-merger CLI
//!
//! One-shot run: load config, aggregate, merge, write, notify, exit.

use anyhow::Context;
use clap::Parser;
use site_merger::{Notifier, Pipeline, RunConfig, SiteClient};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Merge site entries from remote configs into a base document
#[derive(Parser, Debug)]
#[command(name = "site-merger")]
#[command(version)]
#[command(about = "Aggregate site entries from remote JSON configs into one document")]
struct Args {
    /// Path to the run configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Override the merged output path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the aggregated results path
    #[arg(long)]
    aggregated_output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Skip the run notification even if an endpoint is configured
    #[arg(long)]
    no_notify: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.verbose { "debug" } else { "info" })
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = RunConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(path) = args.aggregated_output {
        config.aggregated_output = Some(path);
    }

    tracing::info!(
        "site-merger {} starting: {} sources, {} targets",
        site_merger::VERSION,
        config.sources.len(),
        config.targets.len()
    );

    let client = SiteClient::new(&config.fetch_options()).context("building HTTP client")?;

    let notifier = match (&config.notify_url, args.no_notify) {
        (Some(url), false) => {
            Some(Notifier::new(url.clone(), config.timeout()).context("building notifier")?)
        }
        _ => None,
    };

    let mut pipeline = Pipeline::new(config, client);
    if let Some(notifier) = notifier {
        pipeline = pipeline.with_notifier(notifier);
    }

    let report = pipeline.execute().await.context("run aborted")?;

    if report.is_degraded() {
        tracing::warn!("Run finished with warnings:\n{}", report.summary());
    } else {
        tracing::info!("{}", report.title());
    }

    Ok(())
}
