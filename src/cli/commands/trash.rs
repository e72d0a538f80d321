//! attic trash - List recycle-bin records
//!
//! Accepts either a document (every deleted attachment of it) or a full
//! attachment reference (every deletion of that one attachment).

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::commands::{format_size, version_line};
use crate::cli::output::{emit_human, emit_ok, HumanLayout};
use crate::error::Result;
use crate::model::{AttachmentMetadata, AttachmentRef, DeletedAttachment, DocumentRef};

#[derive(Args, Debug)]
pub struct TrashArgs {
    /// Document name, or <document>/<file> for one attachment
    pub target: String,

    /// Treat the target as a document even if it contains '/'
    #[arg(long)]
    pub document: bool,
}

#[derive(Serialize)]
struct TrashEntry<'a> {
    key: String,
    deleted_at: chrono::DateTime<chrono::Utc>,
    deleter: Option<&'a str>,
    metadata: &'a AttachmentMetadata,
    versions: usize,
    total_size: u64,
}

impl<'a> TrashEntry<'a> {
    fn of(record: &'a DeletedAttachment) -> Self {
        let versions = record.versions().unwrap_or_default();
        Self {
            key: record.key().to_string(),
            deleted_at: record.deleted_at(),
            deleter: record.deleter(),
            metadata: record.metadata(),
            versions: versions.len(),
            total_size: versions.iter().map(|v| v.metadata.size).sum(),
        }
    }
}

pub fn run(ctx: &AppContext, args: &TrashArgs) -> Result<()> {
    let records = if args.document || !args.target.contains('/') {
        let document: DocumentRef = args.target.parse()?;
        ctx.adapter.list_deleted_in(&document)?
    } else {
        let reference: AttachmentRef = args.target.parse()?;
        ctx.adapter.list_deleted(&reference)?
    };
    let entries: Vec<TrashEntry<'_>> = records.iter().map(TrashEntry::of).collect();

    if ctx.json() {
        return emit_ok(serde_json::json!({
            "records": entries,
            "count": entries.len(),
        }));
    }

    if entries.is_empty() {
        println!("Recycle bin is empty for {}.", args.target);
        return Ok(());
    }

    let mut layout = HumanLayout::new();
    layout.title("Recycle bin");
    for entry in &entries {
        layout.push_line(entry.key.cyan().to_string());
        layout.push_line(format!("    {}", version_line(entry.metadata)));
        layout.push_line(
            format!(
                "    deleted {}{}, {} version(s), {}",
                entry.deleted_at.format("%Y-%m-%d %H:%M:%S"),
                entry.deleter.map(|d| format!(" by {d}")).unwrap_or_default(),
                entry.versions,
                format_size(entry.total_size)
            )
            .dimmed()
            .to_string(),
        );
        layout.blank();
    }
    emit_human(layout);
    Ok(())
}
