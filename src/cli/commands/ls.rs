//! attic ls - List the attachments of a document

use clap::Args;
use serde_json::json;

use crate::app::AppContext;
use crate::cli::output::{emit_human, emit_ok, HumanLayout};
use crate::error::Result;
use crate::model::DocumentRef;

#[derive(Args, Debug)]
pub struct LsArgs {
    /// Document whose attachments to list
    pub document: DocumentRef,
}

pub fn run(ctx: &AppContext, args: &LsArgs) -> Result<()> {
    let names = ctx.adapter.list_attachments(&args.document)?;

    if ctx.json() {
        return emit_ok(json!({
            "document": args.document,
            "attachments": names,
            "count": names.len(),
        }));
    }

    if names.is_empty() {
        println!("No attachments in {}.", args.document);
        return Ok(());
    }
    let mut layout = HumanLayout::new();
    for name in &names {
        layout.push_line(name.as_str());
    }
    emit_human(layout);
    Ok(())
}
