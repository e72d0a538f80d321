//! attic rm - Delete an attachment

use clap::Args;
use colored::Colorize;
use serde_json::json;

use crate::app::AppContext;
use crate::cli::output::emit_ok;
use crate::error::Result;
use crate::model::AttachmentRef;

#[derive(Args, Debug)]
pub struct RmArgs {
    /// Attachment reference (<document>/<file>)
    pub reference: AttachmentRef,

    /// Skip the recycle bin
    #[arg(long)]
    pub permanent: bool,

    /// Name recorded as the deleter
    #[arg(long, env = "ATTIC_DELETER")]
    pub deleter: Option<String>,

    /// Leave the document's attachment list untouched
    #[arg(long)]
    pub no_container: bool,
}

pub fn run(ctx: &AppContext, args: &RmArgs) -> Result<()> {
    let update_container = !args.no_container;
    let outcome = if args.permanent {
        ctx.adapter.delete_permanently(&args.reference, update_container)?
    } else {
        ctx.adapter
            .delete(&args.reference, args.deleter.as_deref(), update_container)?
    };

    if ctx.json() {
        return emit_ok(json!({
            "reference": args.reference.to_string(),
            "deleted_key": outcome.deleted.as_ref().map(ToString::to_string),
            "outcome": outcome,
        }));
    }

    match &outcome.deleted {
        Some(key) => println!(
            "{} {} (restore with: attic restore {})",
            "Moved to recycle bin".green().bold(),
            args.reference.to_string().cyan(),
            key
        ),
        None => println!(
            "{} {}",
            "Deleted".green().bold(),
            args.reference.to_string().cyan()
        ),
    }
    Ok(())
}
