use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use augur_agents::Persistence;
use augur_feed::DecisionFeed;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "augur-feed",
    about = "Augur decision feed daemon - scans every active user on an interval and pushes actionable decisions"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/augur.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Run a single tick and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = augur::load_config(&cli.config)?;
    let components = augur::build_components(&config).context("Failed to build pipeline")?;

    let persistence: Arc<dyn Persistence> = components.store.clone();
    let feed = DecisionFeed::new(
        Arc::new(components.pipeline),
        persistence,
        components.notifier,
        Duration::from_secs(config.feed.interval_seconds),
    );

    if cli.once {
        let report = feed
            .run_tick()
            .await
            .map_err(|e| anyhow::anyhow!("Feed tick failed: {e}"))?;
        tracing::info!(?report, "Single tick complete");
        return Ok(());
    }

    let cancel = feed.cancel_token();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received shutdown signal");
        cancel.cancel();
    });

    feed.run().await;
    Ok(())
}
