//! Logging initialization and configuration.
//!
//! Uses the `tracing` ecosystem with human-readable or JSON output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// # Arguments
///
/// * `level` - Default filter directive when RUST_LOG is unset.
/// * `json_format` - If true, outputs structured JSON logs; otherwise pretty-printed.
///
/// # Notes
///
/// - Log output goes to stderr (stdout is reserved for reports and record dumps)
/// - The RUST_LOG environment variable overrides the level
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section.
///
/// `--verbose` raises the level to at least debug; `--json-logs` forces JSON.
pub fn init_from_config(
    config: &relgraph_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    init(
        effective_level(&config.logging.level, verbose_override),
        json_logs_override || config.logging.format == "json",
    );
}

fn effective_level(configured: &str, verbose: bool) -> &str {
    if verbose && configured != "trace" {
        "debug"
    } else {
        configured
    }
}
