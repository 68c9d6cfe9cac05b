//! # Import
//!
//! Store files in the tree and index a record for each.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use kolekto_cas::IngestMode;
use kolekto_config::{log_import_debug, log_import_info, log_import_warn};
use kolekto_index::Record;
use kolekto_tree::Catalog;

use crate::datasource::{clean_title, DatasourceRegistry};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Files to import (globbing allowed)
    #[arg(required = true, value_name = "FILE")]
    files: Vec<String>,

    /// Hard link the file into the tree instead of copying it
    #[arg(long, conflicts_with = "symlink")]
    hardlink: bool,

    /// Symlink the file from the tree instead of copying it
    #[arg(long, conflicts_with = "delete")]
    symlink: bool,

    /// Delete the source file once imported
    #[arg(long)]
    delete: bool,

    /// Take the first search result without asking
    #[arg(short, long)]
    auto: bool,

    /// Title to search instead of the one guessed from the file name
    #[arg(long)]
    title: Option<String>,

    /// Release year to search instead of the one guessed from the file name
    #[arg(long)]
    year: Option<i64>,
}

impl ImportArgs {
    fn mode(&self) -> IngestMode {
        if self.symlink {
            IngestMode::Symlink
        } else if self.hardlink {
            IngestMode::Hardlink
        } else {
            IngestMode::Copy
        }
    }
}

/// Outcome for one file.
#[derive(Debug, PartialEq, Eq)]
enum Imported {
    Stored,
    AlreadyInTree,
    NoMatch,
}

pub fn run(catalog: &Catalog, args: ImportArgs) -> Result<()> {
    let registry = super::registry(catalog)?;

    let mut files = Vec::new();
    for pattern in &args.files {
        let matches = expand_glob(pattern)?;
        if matches.is_empty() {
            eprintln!("{} No file matches {}", style("warning:").yellow(), pattern);
        }
        files.extend(matches);
    }

    let (mut stored, mut skipped, mut failed) = (0usize, 0usize, 0usize);
    for file in &files {
        match import_file(catalog, &registry, &args, file) {
            Ok(Imported::Stored) => stored += 1,
            Ok(Imported::AlreadyInTree | Imported::NoMatch) => skipped += 1,
            Err(e) => {
                eprintln!("{} Failed to import {}: {:#}", style("error:").red(), file.display(), e);
                log_import_warn!(
                    "Import failed",
                    file = tracing::field::display(file.display()),
                    error = tracing::field::display(&e)
                );
                failed += 1;
            }
        }
    }

    if files.len() > 1 || failed > 0 {
        println!("Imported {} files, skipped {}, failed {}.", stored, skipped, failed);
    }
    if failed > 0 {
        bail!("{} of {} files could not be imported", failed, files.len());
    }
    Ok(())
}

/// Wildcards only pick regular files; a path named literally is always kept
/// so that a bad argument is reported instead of silently dropped.
fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let literal = !pattern.contains(['*', '?', '[']);
    let mut paths = Vec::new();
    for entry in glob::glob(pattern).with_context(|| format!("Bad file pattern {:?}", pattern))? {
        let path = entry?;
        if literal || path.is_file() {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn import_file(catalog: &Catalog, registry: &DatasourceRegistry, args: &ImportArgs, path: &Path) -> Result<Imported> {
    log_import_debug!("Importing file", file = tracing::field::display(path.display()));
    if !path.is_file() {
        bail!("not a regular file");
    }
    let short_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    let (guessed_title, guessed_year) = clean_title(&stem);
    let title = args.title.clone().unwrap_or(guessed_title);
    let year = args.year.or(guessed_year);

    let mut candidates = registry.search(&title, year)?;
    let candidate = match candidates.len() {
        0 => {
            println!("No results to display for the file: {}", short_name);
            return Ok(Imported::NoMatch);
        }
        1 => candidates.remove(0),
        _ if args.auto => candidates.remove(0),
        _ => {
            println!("Several movies match the file {}:", short_name);
            for candidate in &candidates {
                println!(
                    "  {} [{}]",
                    super::summary(catalog, &candidate.record)?,
                    candidate.datasource
                );
            }
            println!("Use --auto to take the first one, or --title/--year to narrow the search.");
            return Ok(Imported::NoMatch);
        }
    };

    let mut record = registry.refresh(candidate.record)?;
    if let Some(ext) = ext {
        if !record.contains_key("ext") {
            record.insert("ext", ext);
        }
    }

    let id = match store_with_progress(catalog, path, args.mode(), &short_name) {
        Ok(id) => id,
        Err(e) if e.is_duplicate() => {
            println!("Skipped {}: {}", short_name, e);
            log_import_warn!("Content already in tree", file = tracing::field::display(path.display()));
            return Ok(Imported::AlreadyInTree);
        }
        Err(e) => return Err(e.into()),
    };

    catalog.index().save(&id, &record)?;
    log_import_info!("Movie saved to the index", id = tracing::field::display(&id), file = tracing::field::display(path.display()));
    println!("{} {}", style(id.short()).reverse(), summary_or_title(catalog, &record));

    if args.delete {
        fs::remove_file(path).with_context(|| format!("Failed to delete {}", path.display()))?;
        log_import_debug!("Deleted original file", file = tracing::field::display(path.display()));
    }
    Ok(Imported::Stored)
}

fn store_with_progress(
    catalog: &Catalog,
    path: &Path,
    mode: IngestMode,
    label: &str,
) -> kolekto_cas::Result<kolekto_cas::ContentId> {
    let size = fs::metadata(path)?.len();
    let pb = ProgressBar::new(size);
    if let Ok(template) =
        ProgressStyle::with_template("{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
    {
        pb.set_style(template.progress_chars("=> "));
    }
    pb.set_message(match mode {
        IngestMode::Copy => format!("copying {}", label),
        IngestMode::Hardlink | IngestMode::Symlink => format!("hashing {}", label),
    });

    let result = catalog.store().put_file(path, mode, |done| pb.set_position(done));
    pb.finish_and_clear();
    result
}

fn summary_or_title(catalog: &Catalog, record: &Record) -> String {
    super::summary(catalog, record)
        .unwrap_or_else(|_| record.text("title").unwrap_or_default().to_string())
}
