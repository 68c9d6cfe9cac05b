//! # View reconciliation
//!
//! Views are directories of symlinks into the store, one link per pattern
//! expansion of every record. Reconciling computes the desired links from
//! the index, reads the actual ones from disk and applies the difference:
//!
//! 1. **Desired**: `view root / expansion -> identifier` for each record,
//!    view and pattern (first mapping wins on collision)
//! 2. **Actual**: every symlink under the view roots, its target resolved
//!    lexically against the store directory
//! 3. **Diff**: `actual - desired` is deleted, `desired - actual` created,
//!    compared as `(path, identifier)` pairs so a retargeted path is both
//! 4. **Apply**: deletions, then empty directory pruning (never a view
//!    root), then creations
//!
//! Anything under a view root that is not a symlink or a directory is
//! reported as foreign and left alone.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use kolekto_cas::paths::{relative_path, resolve_link_target};
use kolekto_cas::{symlink_file, ContentId};
use kolekto_config::{log_link_debug, log_link_info, log_link_warn, ViewConfig};
use kolekto_index::{KvBackend, MetadataIndex, Record};
use walkdir::WalkDir;

use crate::pattern::{Pattern, PatternError};
use crate::Result;

/// A link path (relative to the tree root) and the identifier it targets.
pub type Link = (PathBuf, ContentId);

/// One view: a root directory and the patterns naming its links.
#[derive(Debug, Clone)]
pub struct ViewRule {
    pub name: String,
    /// Relative to the tree root
    pub root: PathBuf,
    pub patterns: Vec<Pattern>,
}

impl ViewRule {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, patterns: Vec<Pattern>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            patterns,
        }
    }

    pub fn from_config(view: &ViewConfig) -> std::result::Result<Self, PatternError> {
        let patterns = view
            .patterns
            .iter()
            .map(|p| Pattern::parse(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(view.name.clone(), view.root_dir(), patterns))
    }
}

/// Hook applied to each record before its patterns are expanded.
pub trait Enricher {
    fn attach(&self, id: &ContentId, record: Record) -> Record;
}

/// Records are expanded as stored.
pub struct NoEnrichment;

impl Enricher for NoEnrichment {
    fn attach(&self, _id: &ContentId, record: Record) -> Record {
        record
    }
}

/// Two identifiers expanding to the same link path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub path: PathBuf,
    pub kept: ContentId,
    pub dropped: ContentId,
}

/// An expansion that can't be used as a link path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub id: ContentId,
    pub view: String,
    pub expansion: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct DesiredLinks {
    pub links: BTreeMap<PathBuf, ContentId>,
    pub collisions: Vec<Collision>,
    pub rejected: Vec<Rejected>,
    /// Index keys that are not content identifiers; they get no links
    pub invalid_ids: Vec<ContentId>,
}

#[derive(Debug, Clone, Default)]
pub struct ActualLinks {
    pub links: BTreeMap<PathBuf, ContentId>,
    /// Regular files and other non-links found in views
    pub foreign: Vec<PathBuf>,
    /// Subdirectories of view roots, view roots excluded
    pub dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub to_delete: Vec<Link>,
    pub to_create: Vec<Link>,
    pub collisions: Vec<Collision>,
    pub rejected: Vec<Rejected>,
    pub invalid_ids: Vec<ContentId>,
    pub foreign: Vec<PathBuf>,
    /// Per-path failures while applying the diff
    pub failures: Vec<(PathBuf, String)>,
    pub removed_dirs: Vec<PathBuf>,
    pub dry_run: bool,
}

impl ReconcileReport {
    /// Nothing left to delete or create.
    pub fn is_converged(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty()
    }
}

/// Synchronizes the view directories of one tree with its index.
pub struct LinkReconciler<'a> {
    tree_root: &'a Path,
    store_root: &'a Path,
    views: &'a [ViewRule],
}

impl<'a> LinkReconciler<'a> {
    /// `tree_root` and `store_root` must be absolute.
    pub fn new(tree_root: &'a Path, store_root: &'a Path, views: &'a [ViewRule]) -> Self {
        Self {
            tree_root,
            store_root,
            views,
        }
    }

    /// Links the index calls for.
    pub fn desired<B, E>(&self, index: &MetadataIndex<B>, enricher: &E) -> Result<DesiredLinks>
    where
        B: KvBackend,
        E: Enricher + ?Sized,
    {
        let mut desired = DesiredLinks::default();

        for item in index.iter()? {
            let (id, record) = item?;
            if !id.is_well_formed() {
                log_link_warn!("Skipping malformed index key", id = tracing::field::debug(&id));
                desired.invalid_ids.push(id);
                continue;
            }
            let record = enricher.attach(&id, record);

            for view in self.views {
                for pattern in &view.patterns {
                    for expansion in pattern.expand(&record) {
                        let relative = match check_expansion(&expansion) {
                            Ok(relative) => relative,
                            Err(reason) => {
                                log_link_warn!(
                                    "Rejected link name",
                                    id = id.as_str(),
                                    expansion = expansion.as_str(),
                                    reason = reason
                                );
                                desired.rejected.push(Rejected {
                                    id: id.clone(),
                                    view: view.name.clone(),
                                    expansion,
                                    reason,
                                });
                                continue;
                            }
                        };

                        let path = view.root.join(relative);
                        match desired.links.get(&path) {
                            Some(kept) if *kept == id => {}
                            Some(kept) => {
                                log_link_warn!(
                                    "Duplicate link",
                                    path = tracing::field::debug(&path),
                                    kept = kept.as_str(),
                                    dropped = id.as_str()
                                );
                                desired.collisions.push(Collision {
                                    path,
                                    kept: kept.clone(),
                                    dropped: id.clone(),
                                });
                            }
                            None => {
                                desired.links.insert(path, id.clone());
                            }
                        }
                    }
                }
            }
        }

        Ok(desired)
    }

    /// Links currently on disk. Missing view roots contribute nothing.
    pub fn actual(&self) -> Result<ActualLinks> {
        let mut actual = ActualLinks::default();

        for view in self.views {
            let dir = self.tree_root.join(&view.root);
            if !dir.is_dir() {
                if dir.symlink_metadata().is_ok() {
                    actual.foreign.push(view.root.clone());
                }
                continue;
            }

            let walker = WalkDir::new(&dir)
                .follow_links(false)
                .min_depth(1)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry?;
                let relative = self.tree_relative(entry.path());
                let file_type = entry.file_type();

                if file_type.is_symlink() {
                    let target = fs::read_link(entry.path())?;
                    let resolved = resolve_link_target(entry.path(), &target);
                    let id = relative_path(self.store_root, &resolved);
                    actual
                        .links
                        .insert(relative, ContentId::from_entry_name(id.to_string_lossy()));
                } else if file_type.is_dir() {
                    actual.dirs.push(relative);
                } else {
                    actual.foreign.push(relative);
                }
            }
        }

        Ok(actual)
    }

    /// Compute the diff and, unless `dry_run`, apply it.
    pub fn reconcile<B, E>(&self, index: &MetadataIndex<B>, enricher: &E, dry_run: bool) -> Result<ReconcileReport>
    where
        B: KvBackend,
        E: Enricher + ?Sized,
    {
        let desired = self.desired(index, enricher)?;
        let actual = self.actual()?;

        let desired_set: BTreeSet<Link> = desired.links.into_iter().collect();
        let actual_set: BTreeSet<Link> = actual.links.into_iter().collect();

        let mut report = ReconcileReport {
            to_delete: actual_set.difference(&desired_set).cloned().collect(),
            to_create: desired_set.difference(&actual_set).cloned().collect(),
            collisions: desired.collisions,
            rejected: desired.rejected,
            invalid_ids: desired.invalid_ids,
            foreign: actual.foreign,
            dry_run,
            ..Default::default()
        };

        log_link_info!(
            "Computed link diff",
            delete = report.to_delete.len(),
            create = report.to_create.len(),
            dry_run = dry_run
        );

        if dry_run {
            return Ok(report);
        }

        let mut prune: BTreeSet<PathBuf> = actual.dirs.into_iter().collect();
        for (path, _) in &report.to_delete {
            match fs::remove_file(self.tree_root.join(path)) {
                Ok(()) => log_link_debug!("Deleted link", path = tracing::field::debug(path)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    report.failures.push((path.clone(), e.to_string()));
                    continue;
                }
            }
            prune.extend(self.parents_below_root(path));
        }

        report.removed_dirs = self.prune_empty_dirs(prune, &mut report.failures);

        for (path, id) in &report.to_create {
            match self.create_link(path, id) {
                Ok(()) => log_link_debug!(
                    "Created link",
                    path = tracing::field::debug(path),
                    id = id.as_str()
                ),
                Err(e) => {
                    log_link_warn!(
                        "Failed to create link",
                        path = tracing::field::debug(path),
                        error = tracing::field::display(&e)
                    );
                    report.failures.push((path.clone(), e.to_string()));
                }
            }
        }

        Ok(report)
    }

    fn tree_relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(self.tree_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    fn view_root_of(&self, path: &Path) -> Option<&Path> {
        self.views
            .iter()
            .map(|v| v.root.as_path())
            .find(|root| path.starts_with(root))
    }

    /// Directories between `path` and its view root, exclusive on both ends.
    fn parents_below_root(&self, path: &Path) -> Vec<PathBuf> {
        let root = self.view_root_of(path);
        path.ancestors()
            .skip(1)
            .take_while(|dir| !dir.as_os_str().is_empty() && Some(*dir) != root)
            .map(Path::to_path_buf)
            .collect()
    }

    /// Remove the empty ones among `dirs`, deepest first.
    fn prune_empty_dirs(&self, dirs: BTreeSet<PathBuf>, failures: &mut Vec<(PathBuf, String)>) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = dirs.into_iter().collect();
        dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));

        let mut removed = Vec::new();
        for dir in dirs {
            if self.views.iter().any(|v| v.root == dir) {
                continue;
            }
            match fs::remove_dir(self.tree_root.join(&dir)) {
                Ok(()) => {
                    log_link_debug!("Deleted directory", dir = tracing::field::debug(&dir));
                    removed.push(dir);
                }
                Err(e) if is_expected_rmdir_error(&e) => {}
                Err(e) => failures.push((dir, e.to_string())),
            }
        }
        removed
    }

    fn create_link(&self, path: &Path, id: &ContentId) -> io::Result<()> {
        let full = self.tree_root.join(path);
        let dir = full
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "link path has no parent"))?;
        fs::create_dir_all(dir)?;
        let target = relative_path(dir, &self.store_root.join(id.as_str()));
        symlink_file(&target, &full)
    }
}

fn is_expected_rmdir_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::DirectoryNotEmpty | io::ErrorKind::NotFound | io::ErrorKind::AlreadyExists
    )
}

/// Validate one pattern expansion as a relative link path.
fn check_expansion(expansion: &str) -> std::result::Result<PathBuf, &'static str> {
    if expansion.is_empty() {
        return Err("empty name");
    }
    if expansion.contains('\0') {
        return Err("NUL byte in name");
    }
    if expansion.starts_with('/') || Path::new(expansion).is_absolute() {
        return Err("absolute path");
    }
    for segment in expansion.split('/') {
        match segment {
            "" => return Err("empty path component"),
            "." | ".." => return Err("relative path component"),
            _ => {}
        }
    }
    Ok(PathBuf::from(expansion))
}
