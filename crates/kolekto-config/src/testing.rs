//! Test environment abstraction for isolated testing.
//!
//! Provides `TestCatalog` to manage:
//! - a temporary catalog tree with the `.kolekto` layout
//! - a sibling `incoming/` directory for files to import
//! - a catalog-local `config.toml`
//!
//! # Usage
//!
//! ```ignore
//! use kolekto_config::testing::TestCatalog;
//!
//! #[test]
//! fn test_something() {
//!     let env = TestCatalog::new().unwrap();
//!     let film = env.create_incoming("Some.Movie.2001.mkv", b"bytes").unwrap();
//!     // env.tree_root, env.paths().movies_dir() are isolated
//! }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use tempfile::TempDir;

use crate::{CatalogPaths, Config};

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated catalog tree living in a temporary directory
pub struct TestCatalog {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Root of the catalog tree
    pub tree_root: PathBuf,
    /// Files waiting to be imported, outside the tree
    pub incoming: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestCatalog {
    /// Create the directory skeleton and the default config.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        // Catalog::open canonicalizes the tree root (macOS /var -> /private/var).
        let root = temp_dir.path().canonicalize()?;

        let tree_root = root.join(format!("tree-{}", test_id));
        let incoming = root.join("incoming");
        let paths = CatalogPaths::new(&tree_root);

        std::fs::create_dir_all(paths.movies_dir())?;
        std::fs::create_dir_all(&incoming)?;

        let env = Self {
            _temp_dir: temp_dir,
            tree_root,
            incoming,
            test_id,
        };
        env.write_config(config)?;
        Ok(env)
    }

    pub fn paths(&self) -> CatalogPaths {
        CatalogPaths::new(&self.tree_root)
    }

    /// Replace the catalog-local config file.
    pub fn write_config(&self, config: &Config) -> anyhow::Result<()> {
        std::fs::write(self.paths().config_path(), config.to_toml()?)?;
        Ok(())
    }

    /// Create a file outside the tree, ready to be imported.
    pub fn create_incoming(&self, name: &str, content: &[u8]) -> anyhow::Result<PathBuf> {
        let path = self.incoming.join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Create a file inside the tree.
    pub fn create_file(&self, relative_path: &str, content: &[u8]) -> anyhow::Result<PathBuf> {
        let path = self.tree_root.join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Drop a raw entry straight into the store directory.
    pub fn create_store_entry(&self, name: &str, content: &[u8]) -> anyhow::Result<PathBuf> {
        let path = self.paths().movies_dir().join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_isolated() {
        let a = TestCatalog::new().unwrap();
        let b = TestCatalog::new().unwrap();
        assert_ne!(a.tree_root, b.tree_root);
        assert!(a.paths().movies_dir().is_dir());
        assert!(a.paths().config_path().is_file());
    }

    #[test]
    fn test_config_is_loadable() {
        let env = TestCatalog::new().unwrap();
        let config = Config::load_layers(None, &env.paths().config_path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_create_helpers() {
        let env = TestCatalog::new().unwrap();
        let film = env.create_incoming("a.mkv", b"x").unwrap();
        assert!(!film.starts_with(&env.tree_root));
        let note = env.create_file("Titles/sub/notes.txt", b"n").unwrap();
        assert!(note.is_file());
        env.create_store_entry("ab12", b"y").unwrap();
        assert!(env.paths().movies_dir().join("ab12").is_file());
    }
}
