//! Sapwood CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "sapwood")]
#[command(about = "Bottom-up natural-language summaries of a code repository", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Repository root path (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (defaults to sapwood.toml under the root)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the repository and summarize every entity bottom-up
    Summarize(commands::SummarizeArgs),
    /// Index the repository and print the processing levels
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or maintain the summary cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Show version
    Version,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry counts
    Stats,
    /// Delete every cached summary
    Clear,
    /// Drop entries older than the configured TTL
    Cleanup,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sapwood={0},sapwood_core={0},sapwood_indexer={0},sapwood_ai={0}",
            log_level
        ))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Commands::Version = cli.command {
        println!("Sapwood v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    config::load_dotenv(&cli.root);
    let (settings, source) = config::SapwoodConfig::load(&cli.root, cli.config.as_deref())?;
    if let Some(path) = source {
        tracing::info!("Loaded config from {}", path.display());
    }
    tracing::debug!("Repository root: {}", cli.root.display());

    let result = match cli.command {
        Commands::Summarize(args) => commands::summarize(&cli.root, settings, args).await,
        Commands::Plan { json } => commands::plan(&cli.root, &settings, json).await,
        Commands::Cache { action } => match action {
            CacheAction::Stats => commands::cache_stats(&cli.root, &settings),
            CacheAction::Clear => commands::cache_clear(&cli.root, &settings),
            CacheAction::Cleanup => commands::cache_cleanup(&cli.root, &settings),
        },
        Commands::Version => Ok(()),
    };
    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    result
}
