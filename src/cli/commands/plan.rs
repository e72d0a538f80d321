//! attic plan - Show how operations map onto transactions

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::adapter::{Composition, Facet, Operation};
use crate::app::AppContext;
use crate::cli::output::{emit_human, emit_ok, HumanLayout};
use crate::error::Result;
use crate::tx::ResourceKind;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Plan without the document attachment list
    #[arg(long)]
    pub no_container: bool,
}

#[derive(Serialize)]
struct PlanEntry {
    operation: Operation,
    atomic: bool,
    plan: Composition,
}

#[derive(Serialize)]
struct PlanReport {
    providers: Vec<ResourceKind>,
    stores: Vec<(Facet, ResourceKind)>,
    recycle_bin: bool,
    operations: Vec<PlanEntry>,
}

pub fn run(ctx: &AppContext, args: &PlanArgs) -> Result<()> {
    let adapter = &ctx.adapter;
    let update_container = !args.no_container;
    let report = PlanReport {
        providers: adapter.providers().kinds().collect(),
        stores: adapter.store_kinds(),
        recycle_bin: adapter.recycle_bin_enabled(),
        operations: Operation::ALL
            .iter()
            .filter(|op| **op != Operation::ListAttachments || adapter.has_container())
            .map(|&operation| {
                let plan = adapter.plan(operation, update_container);
                PlanEntry {
                    operation,
                    atomic: plan.is_atomic(),
                    plan: (*plan).clone(),
                }
            })
            .collect(),
    };

    if ctx.json() {
        return emit_ok(report);
    }

    let mut layout = HumanLayout::new();
    layout.title("Stores");
    for (facet, kind) in &report.stores {
        layout.kv(facet.as_str(), kind.as_str());
    }
    layout.blank();
    layout.title("Operations");
    for entry in &report.operations {
        let marker = if entry.atomic {
            "atomic".green()
        } else {
            "degraded".yellow()
        };
        layout.push_line(format!(
            "{:20} {:9} {}",
            entry.operation.as_str(),
            marker,
            entry.plan
        ));
    }
    emit_human(layout);
    Ok(())
}
