//! Relgraph CLI - derive relationship-detection artifacts from scene graphs.
//!
//! Relgraph reads GQA-style scene graphs and writes unified annotations,
//! vocabularies, task-specific remapped annotations, word vectors and predicate
//! probability tables. Artifacts that already exist are left alone.
//!
//! # Usage
//!
//! ```bash
//! # Build every missing artifact
//! relgraph run --data-dir ~/data/gqa --output-dir ./artifacts
//!
//! # See what is already built
//! relgraph status
//!
//! # Dump the first remapped records with their label names
//! relgraph inspect preddet --limit 5
//!
//! # View configuration
//! relgraph config show
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Relgraph - derive relationship-detection artifacts from scene graphs.
#[derive(Parser, Debug)]
#[command(name = "relgraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "RELGRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build every artifact missing from the output directory
    Run(cli::run::RunArgs),

    /// Show which artifacts are present
    Status(cli::status::StatusArgs),

    /// Print remapped annotation records with their label names
    Inspect(cli::inspect::InspectArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match &cli.config {
        Some(path) => relgraph_core::Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => match relgraph_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `relgraph config path`."
                );
                relgraph_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Relgraph v{}", relgraph_core::VERSION);

    match cli.command {
        Commands::Run(args) => cli::run::execute(args, config),
        Commands::Status(args) => cli::status::execute(args, config),
        Commands::Inspect(args) => cli::inspect::execute(args, config),
        Commands::Config(args) => cli::config::execute(args, &config, cli.config.as_deref()),
    }
}
