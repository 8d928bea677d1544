//! Subcommand implementations.

pub mod config;
pub mod inspect;
pub mod run;
pub mod status;
