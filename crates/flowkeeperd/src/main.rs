//! flowkeeperd — the flowkeeper daemon.
//!
//! Single binary that assembles:
//! - Control-plane client and connection profile cache
//! - Topic watcher (discovery + provisioning)
//! - Pipeline supervisor (health sweeps + restarts)
//! - Status API (health, metrics, pipeline/job views)
//!
//! # Usage
//!
//! ```text
//! flowkeeperd run --config /etc/flowkeeper/flowkeeper.toml
//! ARROYO_URL=arroyo:5115 KAFKA_BROKERS=kafka-1:9092,kafka-2:9092 flowkeeperd run
//! flowkeeperd check-config --config flowkeeper.toml
//! ```

mod daemon;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::daemon::Overrides;

#[derive(Parser)]
#[command(name = "flowkeeperd", about = "Flowkeeper pipeline lifecycle daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the watcher, the supervisor and the status API.
    Run {
        /// Path to flowkeeper.toml. Defaults apply when omitted.
        #[arg(long, env = "FLOWKEEPER_CONFIG")]
        config: Option<PathBuf>,

        /// Control-plane address (host:port).
        #[arg(long, env = "ARROYO_URL")]
        control_plane: Option<String>,

        /// Comma-separated broker list.
        #[arg(long, env = "KAFKA_BROKERS", value_delimiter = ',')]
        brokers: Option<Vec<String>>,

        /// Status API port.
        #[arg(long, env = "FLOWKEEPER_PORT")]
        port: Option<u16>,
    },

    /// Load and validate a config file, then print the effective settings.
    CheckConfig {
        #[arg(long, env = "FLOWKEEPER_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run {
            config,
            control_plane,
            brokers,
            port,
        } => {
            let overrides = Overrides {
                control_plane,
                brokers,
                port,
            };
            let config = daemon::load_config(config.as_deref(), &overrides)?;
            daemon::run(config).await
        }
        Command::CheckConfig { config } => {
            let config = daemon::load_config(config.as_deref(), &Overrides::default())?;
            println!("{}", daemon::describe(&config));
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,flowkeeper=debug"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}
