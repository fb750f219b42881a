//! CLI surface for the `aiscout` binary.
//!
//! - `args`: argument definitions (clap)
//! - `run`: entry point, config/wiring, dispatch
//! - `commands`: individual subcommand implementations

mod args;
mod commands;
mod run;

pub use args::{Cli, Commands, ScheduleCommands};
pub use run::{run, Context};
