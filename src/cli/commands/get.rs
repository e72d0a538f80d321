//! attic get - Print the content of an attachment

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::app::AppContext;
use crate::cli::output::emit_ok;
use crate::error::{AtticError, Result};
use crate::model::{AttachmentRef, Version};

#[derive(Args, Debug)]
#[command(disable_version_flag = true)]
pub struct GetArgs {
    /// Attachment reference (<document>/<file>)
    pub reference: AttachmentRef,

    /// Archived version to read instead of the current one
    #[arg(long)]
    pub version: Option<Version>,

    /// Write content to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn run(ctx: &AppContext, args: &GetArgs) -> Result<()> {
    let mut attachment = ctx.adapter.load(&args.reference)?;

    let (metadata, bytes) = match args.version {
        Some(version) if version != attachment.version() => {
            ctx.adapter.load_archive(&mut attachment)?;
            let archived = attachment
                .archive()
                .unwrap_or_default()
                .iter()
                .find(|v| v.version() == version)
                .ok_or_else(|| AtticError::NotFound(format!("{} version {version}", args.reference)))?;
            (archived.metadata.clone(), archived.content.read()?)
        }
        _ => (
            attachment.metadata().clone(),
            attachment.content().unwrap_or_default().to_vec(),
        ),
    };

    if let Some(path) = &args.output {
        std::fs::write(path, &bytes)?;
    }

    if ctx.json() {
        return emit_ok(json!({
            "metadata": metadata,
            "content": if args.output.is_none() {
                Some(String::from_utf8_lossy(&bytes))
            } else {
                None
            },
            "written_to": args.output,
        }));
    }

    if args.output.is_none() {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes)?;
        stdout.flush()?;
    }
    Ok(())
}
