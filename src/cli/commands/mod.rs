//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;
use crate::model::AttachmentMetadata;

pub mod get;
pub mod history;
pub mod ls;
pub mod plan;
pub mod purge;
pub mod put;
pub mod restore;
pub mod rm;
pub mod trash;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Put(args) => put::run(ctx, args),
        Commands::Get(args) => get::run(ctx, args),
        Commands::History(args) => history::run(ctx, args),
        Commands::Ls(args) => ls::run(ctx, args),
        Commands::Rm(args) => rm::run(ctx, args),
        Commands::Trash(args) => trash::run(ctx, args),
        Commands::Restore(args) => restore::run(ctx, args),
        Commands::Purge(args) => purge::run(ctx, args),
        Commands::Plan(args) => plan::run(ctx, args),
    }
}

/// Byte count for humans.
pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// One-line summary of a version for listings.
pub(crate) fn version_line(metadata: &AttachmentMetadata) -> String {
    let mut line = format!(
        "{}  {}  {}",
        metadata.version,
        format_size(metadata.size),
        metadata.updated_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(author) = &metadata.author {
        line.push_str(&format!("  by {author}"));
    }
    if let Some(comment) = &metadata.comment {
        line.push_str(&format!("  \"{comment}\""));
    }
    line
}
