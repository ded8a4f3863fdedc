//! gymcoach CLI: the main entry point.
//!
//! Commands:
//! - `ask`:      Run one coach turn against a seed or demo profile
//! - `context`:  Show the context contract and fingerprint
//! - `resolve`:  Resolve exercise names against the library
//! - `config`:   Print, locate or check configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "gymcoach", about = "gymcoach: LLM fitness coach orchestration", version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the coach a single question
    Ask {
        /// The user message
        #[arg(short, long)]
        message: String,

        /// Force a response mode: general, workout or template_json
        #[arg(long)]
        mode: Option<String>,

        /// Do not share fitness data with the model
        #[arg(long)]
        no_context: bool,

        /// Offer write tools; each write is proposed and must be confirmed
        #[arg(long)]
        enable_writes: bool,

        /// Confirm every proposal without prompting
        #[arg(short, long)]
        yes: bool,

        /// Print the full turn result as JSON
        #[arg(long)]
        json: bool,

        /// Seed file with the user's fitness data (demo profile if omitted)
        #[arg(long, env = "GYMCOACH_DATA")]
        data: Option<PathBuf>,
    },

    /// Show what the model would be told about the user
    Context {
        /// Print the full snapshot, not only the contract
        #[arg(long)]
        full: bool,

        #[arg(long, env = "GYMCOACH_DATA")]
        data: Option<PathBuf>,
    },

    /// Resolve exercise names to library ids
    Resolve {
        /// One or more exercise names
        #[arg(required = true)]
        names: Vec<String>,

        /// Create custom exercises for names with no plausible match
        #[arg(long)]
        create: bool,

        #[arg(long, env = "GYMCOACH_DATA")]
        data: Option<PathBuf>,
    },

    /// Print the default configuration
    Config {
        /// Print the config file path instead
        #[arg(long)]
        path: bool,

        /// Load and validate the current configuration
        #[arg(long)]
        check: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask {
            message,
            mode,
            no_context,
            enable_writes,
            yes,
            json,
            data,
        } => {
            commands::ask::run(commands::ask::AskArgs {
                message,
                mode,
                no_context,
                enable_writes,
                yes,
                json,
                data,
            })
            .await?
        }
        Commands::Context { full, data } => commands::context::run(full, data.as_deref()).await?,
        Commands::Resolve { names, create, data } => commands::resolve::run(&names, create, data.as_deref()).await?,
        Commands::Config { path, check } => {
            if path {
                commands::config_cmd::path()?
            } else if check {
                commands::config_cmd::check()?
            } else {
                commands::config_cmd::show()?
            }
        }
    }

    Ok(())
}
