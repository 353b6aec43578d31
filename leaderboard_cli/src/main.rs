use std::path::Path;

use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser};
use leaderboard_lib::config::ENV_FILE;
use leaderboard_lib::{
    load_credentials, write_snapshot, CodeforcesClient, LeaderboardConfig, ManualInputs,
};

#[derive(Parser)]
#[command(name = "cf-leaderboard")]
#[command(about = "Rebuild the course leaderboard from Codeforces group and rated-round activity")]
struct Cli {}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cf_leaderboard=info".parse()?)
                .add_directive("leaderboard_lib=info".parse()?),
        )
        .with_target(false)
        .init();

    let config = LeaderboardConfig::from_env()?;

    let matches = Cli::command().after_help(config.describe()).get_matches();
    let _cli = Cli::from_arg_matches(&matches)?;

    let credentials = load_credentials(Path::new(ENV_FILE));
    if credentials.is_none() {
        tracing::warn!(
            "No API credentials found in {} or the environment; group contest calls will fail",
            ENV_FILE
        );
    }

    let inputs = ManualInputs::load(&config).context("loading manual exceptions/exclusions")?;
    let client = CodeforcesClient::new(&config, credentials)?;
    let now = chrono::Utc::now().timestamp();

    let outcome = leaderboard_lib::run(&client, &config, inputs, now).await?;
    write_snapshot(&config.output_path, &outcome.snapshot)
        .with_context(|| format!("writing {}", config.output_path.display()))?;
    tracing::info!("Wrote {}", config.output_path.display());

    let summary = client.tracker().summary();
    for (endpoint, counts) in &summary.by_endpoint {
        tracing::info!(
            "  {}: {} fetched, {} retried, {} failed",
            endpoint,
            counts.fetched,
            counts.retried,
            counts.failed
        );
    }
    let totals = summary.totals();
    tracing::info!(
        "Requests: {} attempts, {} retried ({:.1}s backoff)",
        totals.attempts(),
        totals.retried,
        summary.total_backoff_secs
    );
    if !outcome.unapplied.is_empty() {
        tracing::warn!("{} exception(s) were not applied", outcome.unapplied.len());
    }

    Ok(())
}
