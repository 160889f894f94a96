//! CLI module for Crewrelay
//!
//! - `serve`: start the relay (default)
//! - `agents`: print the agent registry

use clap::{Parser, Subcommand};

pub mod agents;

/// Crewrelay agent relay CLI
#[derive(Parser, Debug)]
#[command(name = "crewrelay")]
#[command(about = "WebSocket relay between clients and a fixed crew of AI agents")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve {
        /// Listening port, overrides PORT and config
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List the registered agents
    Agents {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve { port }) => crate::server::run(port).await,
        Some(Commands::Agents { json }) => agents::run(json),
        None => crate::server::run(None).await,
    }
}
