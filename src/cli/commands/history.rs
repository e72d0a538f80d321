//! attic history - Show the archived versions of an attachment

use clap::Args;
use colored::Colorize;
use serde_json::json;

use crate::app::AppContext;
use crate::cli::commands::version_line;
use crate::cli::output::{emit_human, emit_ok, HumanLayout};
use crate::error::Result;
use crate::model::{AttachmentMetadata, AttachmentRef};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Attachment reference (<document>/<file>)
    pub reference: AttachmentRef,
}

pub fn run(ctx: &AppContext, args: &HistoryArgs) -> Result<()> {
    let mut attachment = ctx.adapter.load(&args.reference)?;
    ctx.adapter.load_archive(&mut attachment)?;
    let versions: Vec<&AttachmentMetadata> = attachment
        .archive()
        .unwrap_or_default()
        .iter()
        .map(|v| &v.metadata)
        .collect();

    if ctx.json() {
        return emit_ok(json!({
            "reference": args.reference.to_string(),
            "current": attachment.version(),
            "versions": versions,
            "count": versions.len(),
        }));
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("History of {}", args.reference));
    for metadata in versions.iter().rev() {
        let line = version_line(metadata);
        if metadata.version == attachment.version() {
            layout.bullet(&format!("{} {}", line, "(current)".green()));
        } else {
            layout.bullet(&line);
        }
    }
    emit_human(layout);
    Ok(())
}
