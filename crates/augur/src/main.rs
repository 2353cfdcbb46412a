use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "augur", about = "Proactive prediction-market advisor")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/augur.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline once for a user and print the raw decisions
    Analyze {
        #[arg(short, long)]
        user: String,

        /// Free-form task label recorded on the run
        #[arg(short, long, default_value = "proactive_scan")]
        task: String,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print a user's persisted decision feed, newest first
    Decisions {
        #[arg(short, long)]
        user: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
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

    let output = match cli.command {
        Command::Analyze { user, task, pretty } => {
            let components =
                augur::build_components(&config).context("Failed to build pipeline")?;
            let response = components
                .pipeline
                .analyze(&user, &task)
                .await
                .map_err(|e| anyhow::anyhow!("Analysis failed: {e}"))?;
            to_json(&response, pretty)?
        }
        Command::Decisions {
            user,
            limit,
            pretty,
        } => {
            let store = augur::store::SqliteStore::open(&config.store.sqlite_path)
                .with_context(|| format!("Failed to open store: {}", config.store.sqlite_path))?;
            let decisions = store
                .recent_decisions(&user, limit)
                .context("Failed to read decision feed")?;
            to_json(&decisions, pretty)?
        }
    };
    println!("{output}");

    Ok(())
}
