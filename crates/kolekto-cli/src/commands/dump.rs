use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use kolekto_index::DumpEntry;
use kolekto_tree::Catalog;

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// JSON dump to restore
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

/// Write the whole index to stdout as `[{"hash": ..., "movie": {...}}, ...]`.
pub fn dump(catalog: &Catalog) -> Result<()> {
    let entries = catalog.index().dump()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer(&mut out, &entries)?;
    writeln!(out)?;
    Ok(())
}

pub fn restore(catalog: &Catalog, args: RestoreArgs) -> Result<()> {
    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let entries: Vec<DumpEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid dump {}", args.file.display()))?;
    for entry in &entries {
        tracing::info!("Loading {}", entry.hash);
    }
    let count = catalog.index().restore(entries)?;
    println!("Loaded {} movies.", count);
    Ok(())
}
