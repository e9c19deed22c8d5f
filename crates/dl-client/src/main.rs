//! devlink CLI
//!
//! Watches a device's live status/log channel:
//! - `watch` streams status, logs and link changes until Ctrl+C
//! - `snapshot` grabs the initial status and log backlog and prints them
//! - `config` manages the configuration file

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dl_client::commands;
use dl_client::output::print_error;

#[derive(Parser)]
#[command(name = "devlink")]
#[command(author, version, about = "Live status and log client for devlink devices")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "DEVLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Connection overrides shared by the connecting commands
#[derive(clap::Args)]
struct ConnectArgs {
    /// Device page URL (overrides config), e.g. http://192.168.1.100/
    #[arg(short, long)]
    url: Option<String>,

    /// WebSocket port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Reconnect attempts before giving up (overrides config)
    #[arg(long)]
    max_attempts: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream status, logs and errors until Ctrl+C
    Watch {
        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Connect, collect the initial status and logs, print them and exit
    Snapshot {
        #[command(flatten)]
        connect: ConnectArgs,
        /// Seconds to wait for the initial data
        #[arg(short, long, default_value_t = 3)]
        wait: u64,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Get a config value by dotted key
    Get { key: String },
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let result = match cli.command {
        Commands::Watch { connect } => {
            let config = client_config(cli.config.as_ref(), &connect)?;
            commands::watch_command(&config).await
        }

        Commands::Snapshot { connect, wait } => {
            let config = client_config(cli.config.as_ref(), &connect)?;
            commands::snapshot_command(&config, Duration::from_secs(wait)).await
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(cli.config.as_ref()),
            ConfigAction::Get { key } => commands::config_get(cli.config.as_ref(), &key),
            ConfigAction::Init { force } => commands::config_init(cli.config.as_ref(), force),
            ConfigAction::Path => {
                let path = cli
                    .config
                    .clone()
                    .unwrap_or_else(dl_core::config::default_config_path);
                println!("{}", path.display());
                Ok(())
            }
        },
    };

    if let Err(e) = &result {
        print_error(&format!("{:#}", e));
    }
    result
}

/// Load the configuration and apply command-line overrides
fn client_config(
    config_path: Option<&PathBuf>,
    overrides: &ConnectArgs,
) -> Result<dl_core::config::ClientConfig> {
    let mut config = commands::load_client_config(config_path)?;
    if let Some(url) = &overrides.url {
        config.page_url = url.clone();
    }
    if let Some(port) = overrides.port {
        config.port = port;
    }
    if let Some(max_attempts) = overrides.max_attempts {
        config.backoff.max_attempts = max_attempts;
    }
    Ok(config)
}
