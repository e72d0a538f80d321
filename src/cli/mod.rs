//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use output::OutputFormat;

pub mod commands;
pub mod output;

/// attic - versioned attachments with a recycle bin
#[derive(Parser, Debug)]
#[command(name = "attic")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit machine-readable JSON (shorthand for --output-format=json)
    #[arg(long, short = 'm', global = true)]
    pub json: bool,

    /// Output format (human, json)
    #[arg(long, short = 'O', global = true, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: <root>/attic.toml)
    #[arg(long, global = true, env = "ATTIC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storage root directory
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    #[must_use]
    pub const fn output_format(&self) -> OutputFormat {
        OutputFormat::from_args(self.json, self.output_format)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a new version of an attachment
    Put(commands::put::PutArgs),

    /// Print the content of an attachment
    Get(commands::get::GetArgs),

    /// Show the archived versions of an attachment
    History(commands::history::HistoryArgs),

    /// List the attachments of a document
    Ls(commands::ls::LsArgs),

    /// Delete an attachment (to the recycle bin unless disabled)
    Rm(commands::rm::RmArgs),

    /// List recycle-bin records of a document or attachment
    Trash(commands::trash::TrashArgs),

    /// Bring a deleted attachment back
    Restore(commands::restore::RestoreArgs),

    /// Remove a recycle-bin record for good
    Purge(commands::purge::PurgeArgs),

    /// Show how operations map onto transactions with this configuration
    Plan(commands::plan::PlanArgs),
}
