//! Scriptor CLI
//!
//! Command-line interface for submitting and managing scripts on a Scriptor
//! server.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "scriptor")]
#[command(about = "Scriptor script execution CLI", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(long, env = "SCRIPTOR_SERVER_URL", default_value = "http://localhost:8080")]
    server_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server_url,
    };

    handle_command(cli.command, &config).await
}
