//! Command-line argument definitions (clap derive).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aiscout - multi-source AI-content ingestion pipeline.
#[derive(Parser)]
#[command(name = "aiscout")]
#[command(about = "Fetches, screens, translates, and stores AI-relevant content from configured sources")]
#[command(long_about = r#"
aiscout polls a set of configured sources (headlines, repos, papers, feeds),
screens each item with an LLM classifier, translates and normalizes the
survivors, and appends them to a daily JSON sink plus a durable project
state store.

EXAMPLES:
  # Run one source once and print its summary
  aiscout fetch headline

  # Run every scheduled source once, ignoring time-of-day
  aiscout schedule once

  # Start the minute-tick scheduler loop (foreground)
  aiscout schedule serve

  # Print project-store counters
  aiscout status

  # Render today's digest for a source as Markdown
  aiscout digest headline

CONFIGURATION:
  A single TOML document is the source of truth. Use --config to point at
  a non-default path; otherwise ./config.toml is used.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Emit logs as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single configured source once and print its run summary.
    Fetch {
        /// Source key as it appears under `[sources.<key>]`.
        source: String,
        /// Print the run summary as JSON instead of a human summary.
        #[arg(long)]
        json: bool,
    },
    /// Scheduler controls.
    #[command(subcommand)]
    Schedule(ScheduleCommands),
    /// Print project state store counters.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Render a source's daily output as a Markdown digest.
    Digest {
        /// Source key whose daily sink file to render.
        source: String,
        /// Date to render, `YYYY-MM-DD` (defaults to today).
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// Run every enabled scheduled source once, concurrently.
    Once {
        #[arg(long)]
        json: bool,
    },
    /// Start the minute-tick scheduler loop and run until interrupted.
    Serve,
}
