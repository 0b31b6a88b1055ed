//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod init;
mod job;

pub use init::InitCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a Lua script for execution
    Submit {
        /// Script file, or `-` to read from stdin
        file: String,

        /// Wait for the job to finish (bounded by the server's timeout)
        #[arg(short, long)]
        blocking: bool,
    },
    /// List jobs
    List {
        /// Comma-separated statuses to include (e.g. completed,failed)
        #[arg(short, long)]
        status: Option<String>,

        /// Sort by id descending
        #[arg(long)]
        desc: bool,
    },
    /// Show a job's details and output
    Get {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Follow a job's output until it finishes
    Watch {
        /// Job ID or unambiguous prefix
        id: String,

        /// Polling interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
    /// Stop a queued or running job
    Stop {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Remove finished jobs from the server
    Cleanup {
        /// Job IDs or unambiguous prefixes
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Initialize development environment
    Init {
        #[command(subcommand)]
        command: InitCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Submit { file, blocking } => job::submit(config, &file, blocking).await,
        Commands::List { status, desc } => job::list(config, status.as_deref(), desc).await,
        Commands::Get { id } => job::get(config, &id).await,
        Commands::Watch { id, interval_ms } => job::watch(config, &id, interval_ms).await,
        Commands::Stop { id } => job::stop(config, &id).await,
        Commands::Cleanup { ids } => job::cleanup(config, &ids).await,
        Commands::Init { command } => init::handle_init_command(command, config).await,
    }
}
