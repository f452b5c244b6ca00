//! rxpilot CLI: the main entry point.
//!
//! Commands:
//! - `onboard` : write the default config file
//! - `ask`     : one question, or an interactive chat session
//! - `batch`   : run batch inference over every pending document
//! - `serve`   : start the HTTP gateway (and the batch schedule, if set)
//! - `doctor`  : check config, credentials and reachability

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "rxpilot",
    about = "rxpilot: prescription-aware medical assistant and batch inference",
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
    /// Write the default configuration file
    Onboard,

    /// Ask the assistant a question
    Ask {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Whose stored prescriptions to consult
        #[arg(short, long, env = "RXPILOT_USER_EMAIL")]
        email: Option<String>,
    },

    /// Process every pending document once
    Batch {
        /// Keep records in memory and log notifications instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Start the HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Diagnose configuration and connectivity
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

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
        Commands::Ask { message, email } => commands::ask::run(message, email).await?,
        Commands::Batch { dry_run } => commands::batch::run(dry_run).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
