use anyhow::{Context, Result};
use clap::Args;
use console::style;
use kolekto_tree::{Catalog, ReconcileReport};

use crate::format::format_number;

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Show what would change without touching the views
    #[arg(long)]
    dry_run: bool,
}

pub fn run(catalog: &Catalog, args: LinkArgs) -> Result<()> {
    let registry = super::registry(catalog)?;
    let report = catalog
        .link(&registry, args.dry_run)
        .context("Failed to synchronize views")?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &ReconcileReport) {
    let (deleted, created) = if report.dry_run {
        ("would delete", "would create")
    } else {
        ("deleted", "created")
    };
    for (path, _) in &report.to_delete {
        println!("  {} {}", style("-").red(), path.display());
    }
    for (path, id) in &report.to_create {
        println!("  {} {} -> {}", style("+").green(), path.display(), id.short());
    }

    for collision in &report.collisions {
        eprintln!(
            "{} {} is claimed by {} and {}; keeping {}",
            style("warning:").yellow(),
            collision.path.display(),
            collision.kept.short(),
            collision.dropped.short(),
            collision.kept.short()
        );
    }
    for rejected in &report.rejected {
        eprintln!(
            "{} {} in view {}: {:?} {}",
            style("warning:").yellow(),
            rejected.id.short(),
            rejected.view,
            rejected.expansion,
            rejected.reason
        );
    }
    for id in &report.invalid_ids {
        eprintln!("{} {:?} is not a content identifier, no links made", style("warning:").yellow(), id.as_str());
    }
    for path in &report.foreign {
        eprintln!("{} {} is not a link, left in place", style("warning:").yellow(), path.display());
    }
    for (path, error) in &report.failures {
        eprintln!("{} {}: {}", style("error:").red(), path.display(), error);
    }

    if report.is_converged() {
        println!("Views are up to date.");
    } else {
        println!(
            "Links {}: {}, {}: {}.",
            deleted,
            format_number(report.to_delete.len() as u64),
            created,
            format_number(report.to_create.len() as u64)
        );
    }
    if !report.removed_dirs.is_empty() {
        println!("Removed {} empty directories.", format_number(report.removed_dirs.len() as u64));
    }
    if !report.failures.is_empty() {
        println!("{} operations failed.", format_number(report.failures.len() as u64));
    }
}
