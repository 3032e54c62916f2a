//! CLI interface for Orion
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Orion personal assistant
///
/// A Telegram bot that forwards your messages to an LLM and executes the
/// note and reminder directives it replies with.
#[derive(Parser, Debug)]
#[command(name = "orion")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the bot and serve messages until interrupted
    Run,

    /// Validate configuration, credentials and database access
    Doctor,
}
