//! attic put - Store a new version of an attachment

use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use serde_json::json;

use crate::app::AppContext;
use crate::cli::output::{emit_human, emit_ok, HumanLayout};
use crate::error::{AtticError, Result};
use crate::model::{Attachment, AttachmentRef};

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Attachment reference (<document>/<file>)
    pub reference: AttachmentRef,

    /// File to read content from (default: stdin)
    pub file: Option<PathBuf>,

    /// Author of this version
    #[arg(long)]
    pub author: Option<String>,

    /// MIME type to record
    #[arg(long)]
    pub mime_type: Option<String>,

    /// Comment for this version
    #[arg(long)]
    pub comment: Option<String>,

    /// Do not add the attachment to the document's list
    #[arg(long)]
    pub no_container: bool,
}

pub fn run(ctx: &AppContext, args: &PutArgs) -> Result<()> {
    let bytes = match &args.file {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let mut attachment = match ctx.adapter.load(&args.reference) {
        Ok(mut existing) => {
            existing.set_content(bytes, args.author.as_deref())?;
            existing
        }
        Err(AtticError::NotFound(_)) => {
            let mut fresh = Attachment::new(args.reference.clone(), bytes);
            if let Some(author) = &args.author {
                fresh = fresh.with_author(author);
            }
            fresh
        }
        Err(err) => return Err(err),
    };
    if let Some(mime_type) = &args.mime_type {
        attachment = attachment.with_mime_type(mime_type);
    }
    if let Some(comment) = &args.comment {
        attachment = attachment.with_comment(comment);
    }

    let outcome = ctx.adapter.save(&mut attachment, !args.no_container)?;
    let metadata = attachment.metadata();

    if ctx.json() {
        return emit_ok(json!({
            "reference": metadata.reference,
            "version": metadata.version,
            "size": metadata.size,
            "content_hash": metadata.content_hash,
            "outcome": outcome,
        }));
    }

    let mut layout = HumanLayout::new();
    layout.push_line(format!(
        "{} {} {}",
        "Saved".green().bold(),
        metadata.reference.to_string().cyan(),
        metadata.version
    ));
    if !outcome.atomic {
        layout.push_line(
            format!(
                "  not atomic: ran as {} separate transactions",
                outcome.transactions
            )
            .yellow()
            .to_string(),
        );
    }
    emit_human(layout);
    Ok(())
}
