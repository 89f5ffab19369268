//! Command-line front end for the validation funnel.
//!
//! ```bash
//! # Run the whole funnel
//! gauntlet --problem "chasing unpaid invoices" --audience "freelancers"
//!
//! # With a config overlay and JSON output
//! gauntlet --problem "..." --audience "..." --config funnel.toml --json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use gauntlet::config::check_endpoint;
use gauntlet::{ClientSet, Funnel, FunnelConfig, LogProgress};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Staged product-idea validation funnel", long_about = None)]
struct Cli {
    /// The problem the product idea solves
    #[arg(long)]
    problem: String,

    /// Who has the problem
    #[arg(long)]
    audience: String,

    /// TOML config overlay (thresholds, gates, endpoints)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop at the first kill verdict instead of running all four stages
    #[arg(long, default_value_t = false)]
    stop_on_kill: bool,

    /// Print the summary as JSON instead of a table
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FunnelConfig::from_toml_file(path)?,
        None => FunnelConfig::default(),
    };
    if cli.stop_on_kill {
        config.stop_on_kill = true;
    }
    config.validate()?;

    info!(
        generation = %config.generation.url,
        search = %config.search.url,
        kill_level = %config.kill_level,
        "Funnel starting"
    );

    if !check_endpoint(&config.generation.url).await {
        tracing::warn!(
            url = %config.generation.url,
            "Generation endpoint unreachable; stages will record collaborator errors"
        );
    }

    let clients = ClientSet::from_config(&config)?;
    let funnel = Funnel::new(config, clients).with_progress(Arc::new(LogProgress));

    let mut session = funnel.start_session(&cli.problem, &cli.audience);
    let summary = funnel.run_all(&mut session).await;

    info!(path = %session.navigation_summary(), "Funnel finished");

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }

    Ok(())
}
