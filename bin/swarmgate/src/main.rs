mod commands;
mod runtime;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "swarmgate")]
#[command(about = "Event interception and bot dispatch for agent swarms", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one event through the interceptor and print the result
    Check {
        /// Bot definitions (JSON or YAML); defaults to ~/.swarmgate/bots.json
        #[arg(short, long)]
        bots: Option<PathBuf>,

        /// Event to check (JSON or YAML)
        #[arg(short, long)]
        event: PathBuf,

        /// Swarm state snapshot (JSON or YAML)
        #[arg(short, long)]
        state: Option<PathBuf>,
    },

    /// List the bots a topic would reach, highest priority first
    Match {
        /// Bot definitions (JSON or YAML); defaults to ~/.swarmgate/bots.json
        #[arg(short, long)]
        bots: Option<PathBuf>,

        /// Event type, e.g. chat/message
        topic: String,
    },

    /// Show registration and pattern statistics
    Stats {
        /// Bot definitions (JSON or YAML); defaults to ~/.swarmgate/bots.json
        #[arg(short, long)]
        bots: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Check { bots, event, state } => {
            commands::check::run(bots, &event, state).await?;
        }
        Commands::Match { bots, topic } => {
            commands::match_cmd::run(bots, &topic).await?;
        }
        Commands::Stats { bots } => {
            commands::stats::run(bots).await?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                commands::config_cmd::show().await?;
            }
            ConfigCommands::Init { force } => {
                commands::config_cmd::init(force).await?;
            }
        },
    }

    Ok(())
}
