//! # Garbage Collection
//!
//! Removes store entries that no record references.
//!
//! 1. **Mark**: every indexed identifier plus each record's `_externals`
//! 2. **Sweep**: every entry name in the store directory
//! 3. **Collect**: `present - referenced`, removed one by one
//!
//! A removal failure is recorded and the sweep carries on.

use std::collections::BTreeSet;

use kolekto_cas::{CasError, ContentId, ContentStore};
use kolekto_config::{log_gc_debug, log_gc_info, log_gc_warn};
use kolekto_index::{KvBackend, MetadataIndex};

use crate::Result;

/// Outcome of one collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcReport {
    pub referenced: BTreeSet<ContentId>,
    pub present: BTreeSet<ContentId>,
    /// `present - referenced`
    pub orphans: BTreeSet<ContentId>,
    /// Orphans actually deleted; in a dry run, the ones that would be.
    pub removed: BTreeSet<ContentId>,
    pub failures: Vec<(ContentId, String)>,
    /// Bytes held by the orphans (dangling links count as zero).
    pub reclaimable_bytes: u64,
    pub dry_run: bool,
}

/// Identifiers the index keeps alive.
pub fn referenced_ids<B: KvBackend>(index: &MetadataIndex<B>) -> Result<BTreeSet<ContentId>> {
    let mut referenced = BTreeSet::new();
    for item in index.iter()? {
        let (id, record) = item?;
        referenced.extend(record.externals());
        referenced.insert(id);
    }
    Ok(referenced)
}

/// Run one mark and sweep pass.
pub fn collect<B: KvBackend>(store: &ContentStore, index: &MetadataIndex<B>, dry_run: bool) -> Result<GcReport> {
    let referenced = referenced_ids(index)?;
    log_gc_debug!("Marked referenced entries", count = referenced.len());

    let present = store.list_identifiers()?;
    log_gc_debug!("Listed store entries", count = present.len());

    let orphans: BTreeSet<ContentId> = present.difference(&referenced).cloned().collect();
    let reclaimable_bytes: u64 = orphans
        .iter()
        .map(|id| store.entry_size(id).unwrap_or(0))
        .sum();

    let mut report = GcReport {
        referenced,
        present,
        orphans,
        reclaimable_bytes,
        dry_run,
        ..Default::default()
    };

    if dry_run {
        report.removed = report.orphans.clone();
        return Ok(report);
    }

    for id in &report.orphans {
        match store.remove(id) {
            Ok(()) => {
                log_gc_info!("Removed orphan entry", id = id.as_str());
                report.removed.insert(id.clone());
            }
            Err(e) => {
                log_gc_warn!("Failed to remove orphan entry", id = id.as_str(), error = tracing::field::display(&e));
                report.failures.push((id.clone(), describe(&e)));
            }
        }
    }

    Ok(report)
}

fn describe(e: &CasError) -> String {
    match e {
        CasError::NotFound { .. } => "already gone".to_string(),
        other => other.to_string(),
    }
}
