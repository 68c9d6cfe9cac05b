//! Catalog directory layout.
//!
//! ```text
//! <tree>/
//! ├── .kolekto/
//! │   ├── config.toml
//! │   ├── lock
//! │   ├── metadata.db
//! │   └── movies/
//! └── Titles/            (views)
//! ```

use std::path::{Path, PathBuf};

pub const CATALOG_DIR: &str = ".kolekto";
pub const MOVIES_DIR: &str = "movies";
pub const INDEX_FILE: &str = "metadata.db";
pub const CONFIG_FILE: &str = "config.toml";
pub const LOCK_FILE: &str = "lock";

/// Paths of one catalog tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPaths {
    root: PathBuf,
}

impl CatalogPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog_dir(&self) -> PathBuf {
        self.root.join(CATALOG_DIR)
    }

    pub fn movies_dir(&self) -> PathBuf {
        self.catalog_dir().join(MOVIES_DIR)
    }

    pub fn index_path(&self) -> PathBuf {
        self.catalog_dir().join(INDEX_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.catalog_dir().join(CONFIG_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.catalog_dir().join(LOCK_FILE)
    }

    /// Store directory relative to the tree root (`.kolekto/movies`).
    pub fn link_base() -> PathBuf {
        Path::new(CATALOG_DIR).join(MOVIES_DIR)
    }

    /// Whether `root` already holds a catalog.
    pub fn exists(&self) -> bool {
        self.catalog_dir().is_dir()
    }
}

/// Find the catalog enclosing `start`: the nearest ancestor (or `start`
/// itself) holding a `.kolekto` directory.
pub fn find_root(start: impl AsRef<Path>) -> Option<PathBuf> {
    start
        .as_ref()
        .ancestors()
        .find(|dir| dir.join(CATALOG_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Global config path: `~/.config/kolekto/config.toml` (platform config dir).
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kolekto").join(CONFIG_FILE))
}
