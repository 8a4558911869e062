//! triagent CLI — the main entry point.
//!
//! Commands:
//! - `onboard`       — Initialize config and data directories
//! - `run`           — Run one triage task from the terminal
//! - `gateway`       — Start the HTTP API server
//! - `capabilities`  — List the registered capabilities
//! - `doctor`        — Diagnose configuration and storage health

use clap::{Parser, Subcommand};

mod commands;
mod wiring;

#[derive(Parser)]
#[command(
    name = "triagent",
    about = "triagent — bounded agent loop for support triage",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and data directories
    Onboard,

    /// Run one triage task and print the outcome
    Run {
        /// The support query to triage
        query: String,

        /// Override the step budget
        #[arg(short, long)]
        budget: Option<u32>,

        /// Resume this task from its checkpoint
        #[arg(long)]
        task_id: Option<String>,

        /// Restrict planning to these actions (repeatable)
        #[arg(long = "allow", value_name = "ACTION")]
        allowed: Vec<String>,

        /// Print the full output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the registered capabilities
    Capabilities {
        /// Include each capability's input schema
        #[arg(long)]
        schemas: bool,
    },

    /// Diagnose configuration and storage health
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Run {
            query,
            budget,
            task_id,
            allowed,
            json,
        } => commands::run::run(query, budget, task_id, allowed, json).await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Capabilities { schemas } => commands::capabilities::run(schemas).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
