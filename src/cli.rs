//! CLI definitions for webpilot.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// webpilot CLI.
#[derive(Parser)]
#[command(name = "webpilot")]
#[command(about = "Drive a browser with a language model")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to $WEBPILOT_CONFIG, then ./webpilot.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `webpilot_agent=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Run a single task and exit instead of starting the interactive prompt
    #[arg(short, long, global = true)]
    pub task: Option<String>,

    /// Run the browser without a window
    #[arg(long, global = true)]
    pub headless: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run a task, or the interactive prompt (default)
    Run,

    /// Print the effective configuration and validation results
    Config,
}
