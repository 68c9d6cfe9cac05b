//! # Garbage Collection
//!
//! Delete store entries that no record references, `_externals` included.

use anyhow::{Context, Result};
use clap::Args;
use kolekto_tree::{Catalog, GcReport};

use crate::format::{format_bytes, format_number};

#[derive(Args, Debug)]
pub struct GcArgs {
    /// List orphans without deleting them
    #[arg(long, conflicts_with = "yes")]
    dry_run: bool,

    /// Delete orphans without asking
    #[arg(short, long)]
    yes: bool,
}

pub fn run(catalog: &Catalog, args: GcArgs) -> Result<()> {
    // Without --yes nothing is deleted.
    let report = catalog
        .gc(!args.yes)
        .context("Garbage collection failed")?;
    print_report(&report);

    if report.dry_run && !args.dry_run && !report.orphans.is_empty() {
        println!();
        println!("Run with --yes to delete them.");
    }
    Ok(())
}

fn print_report(report: &GcReport) {
    println!("Found {} entries in the index", format_number(report.referenced.len() as u64));
    println!("Found {} entries in the store", format_number(report.present.len() as u64));
    println!(
        "Found {} orphan files to delete ({})",
        format_number(report.orphans.len() as u64),
        format_bytes(report.reclaimable_bytes)
    );

    if report.dry_run {
        for id in &report.orphans {
            println!("  {}", id);
        }
    } else {
        println!("Deleted {} files.", format_number(report.removed.len() as u64));
    }
    for (id, error) in &report.failures {
        eprintln!("Unable to delete {}: {}", id, error);
    }
    let missing = report.referenced.difference(&report.present).count();
    if missing > 0 {
        eprintln!("{} indexed movies have no store entry.", format_number(missing as u64));
    }
}
