//! attic purge - Remove a recycle-bin record for good

use clap::Args;
use colored::Colorize;
use serde_json::json;

use crate::app::AppContext;
use crate::cli::output::emit_ok;
use crate::error::Result;
use crate::model::DeletedKey;

#[derive(Args, Debug)]
pub struct PurgeArgs {
    /// Deleted-record key (<document>/<file>@<millis>)
    pub key: DeletedKey,
}

pub fn run(ctx: &AppContext, args: &PurgeArgs) -> Result<()> {
    let outcome = ctx.adapter.purge(&args.key)?;

    if ctx.json() {
        return emit_ok(json!({
            "key": args.key.to_string(),
            "outcome": outcome,
        }));
    }

    println!("{} {}", "Purged".green().bold(), args.key.to_string().cyan());
    Ok(())
}
