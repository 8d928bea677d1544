//! The `relgraph config` command for configuration management.

use std::path::Path;

use clap::{Args, Subcommand};
use relgraph_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
///
/// `explicit` is the `--config` path, when one was given.
pub fn execute(args: ConfigArgs, config: &Config, explicit: Option<&Path>) -> anyhow::Result<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);

    match args.command {
        ConfigCommand::Show => {
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            init(&path, force)?;
            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::default().to_toml()?)?;
    Ok(())
}
