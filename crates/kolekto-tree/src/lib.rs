//! # kolekto-tree
//!
//! Operations over a whole catalog tree:
//!
//! - [`Catalog`]: open handle (store + index + views) with exclusive lock
//! - [`gc`]: removal of unreferenced store entries
//! - [`pattern`]: link name templates
//! - [`link`]: view reconciliation
//! - [`duplicates`], [`stats`], [`flags`]: index reports and edits

pub mod catalog;
pub mod duplicates;
pub mod flags;
pub mod gc;
pub mod link;
pub mod pattern;
pub mod stats;

pub use catalog::Catalog;
pub use duplicates::{find_duplicates, DuplicateGroup};
pub use flags::Flag;
pub use gc::{collect, GcReport};
pub use link::{Enricher, LinkReconciler, NoEnrichment, ReconcileReport, ViewRule};
pub use pattern::{expand_all, title_case, Environment, Pattern, PatternError};
pub use stats::{collection_stats, CollectionStats};

use std::io;
use std::path::PathBuf;

use kolekto_cas::CasError;
use kolekto_config::ConfigError;
use kolekto_index::IndexError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error(transparent)]
    Store(#[from] CasError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Error walking views: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Not a kolekto tree: {} (run `kolekto init`)", .0.display())]
    NotACatalog(PathBuf),

    #[error("A kolekto tree already exists in {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("Timeout waiting for tree lock {} after {timeout_secs}s. Another kolekto process may be running.", .path.display())]
    Locked { path: PathBuf, timeout_secs: u64 },
}

pub type Result<T> = std::result::Result<T, TreeError>;
