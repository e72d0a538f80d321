//! attic restore - Bring a deleted attachment back
//!
//! The recycle-bin record is kept; purge it separately once the restored
//! attachment looks right.
//!
//! With `--force` a live attachment of the same name is replaced outright:
//! its content and its whole history become the record's, and archived
//! versions the record does not have are deleted.

use clap::Args;
use colored::Colorize;
use serde_json::json;

use crate::app::AppContext;
use crate::cli::output::emit_ok;
use crate::error::{AtticError, Result};
use crate::model::DeletedKey;

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Deleted-record key (<document>/<file>@<millis>)
    pub key: DeletedKey,

    /// Replace a live attachment with the same name, history included
    #[arg(long)]
    pub force: bool,
}

pub fn run(ctx: &AppContext, args: &RestoreArgs) -> Result<()> {
    let record = ctx.adapter.find_deleted(&args.key)?;
    let reference = record.reference();

    if !args.force {
        match ctx.adapter.load(reference) {
            Ok(_) => {
                return Err(AtticError::InvalidState(format!(
                    "{reference} exists; pass --force to replace it"
                )));
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
    }

    let mut attachment = ctx.adapter.restore(&record)?;
    let outcome = ctx.adapter.save(&mut attachment, true)?;

    if ctx.json() {
        return emit_ok(json!({
            "key": args.key.to_string(),
            "reference": reference.to_string(),
            "version": attachment.version(),
            "versions": attachment.archive().map_or(0, <[_]>::len),
            "outcome": outcome,
        }));
    }

    println!(
        "{} {} {}",
        "Restored".green().bold(),
        reference.to_string().cyan(),
        attachment.version()
    );
    Ok(())
}
