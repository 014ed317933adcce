//! Sentinel Daemon - security event orchestrator
//!
//! The daemon provides:
//! - Continuous event assessment with an adaptive defense posture
//! - Batch analysis of recorded events
//! - Configuration validation
//! - Decoy deployment into a deception network

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentinel_daemon::commands::{analyze, decoys, start, status, validate};
use sentinel_daemon::{DaemonConfig, DaemonResult};
use sentinel_types::SystemMode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sentinel Daemon CLI
#[derive(Parser)]
#[command(name = "sentineld")]
#[command(about = "Sentinel - real-time security event orchestrator", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SENTINEL_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides the configuration file)
    #[arg(long, env = "SENTINEL_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "SENTINEL_LOG_JSON", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Run the orchestrator until Ctrl+C or SIGTERM
    Start {
        /// Operational mode (dev, test, staging, production)
        #[arg(short, long)]
        mode: Option<SystemMode>,
    },

    /// Analyze events from a JSON file
    Analyze {
        /// File holding one event or an array of events
        event_file: PathBuf,

        /// Write results here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start a system and print its status report
    Status,

    /// Validate a configuration file
    ValidateConfig {
        /// Configuration file to check
        file: PathBuf,
    },

    /// Deploy decoys into a deception network
    DeployDecoys {
        /// IPv4 network in CIDR notation (defaults to the configured network)
        #[arg(long)]
        network: Option<String>,

        /// Number of decoys to deploy
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // validate-config reports problems in the file it was given
    if let Commands::ValidateConfig { file } = &cli.command {
        init_tracing(cli.log_level.as_deref().unwrap_or("info"), cli.json);
        return validate::execute(file);
    }

    let config = DaemonConfig::load(cli.config.as_deref())?;
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, cli.json || config.logging.json);

    match cli.command {
        Commands::Start { mode } => start::execute(config, mode).await,
        Commands::Analyze { event_file, output } => {
            analyze::execute(config, &event_file, output.as_deref()).await
        }
        Commands::Status => status::execute(config).await,
        Commands::DeployDecoys { network, count } => {
            decoys::execute(config, network.as_deref(), count).await
        }
        Commands::ValidateConfig { .. } => Ok(()),
    }
}
