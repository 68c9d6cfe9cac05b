//! Catalog handle: one open tree with its store, index and views.
//!
//! A tree is owned by one process at a time. Opening takes an exclusive
//! advisory lock on `.kolekto/lock`, held until the handle is dropped.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;
use kolekto_cas::{ContentId, ContentStore};
use kolekto_config::{find_root, CatalogPaths, Config, Profile};
use kolekto_index::MetadataIndex;
use tracing::{debug, info};

use crate::gc::{self, GcReport};
use crate::link::{Enricher, LinkReconciler, ReconcileReport, ViewRule};
use crate::{Result, TreeError};

/// Default lock timeout in seconds
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 30;

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

pub struct Catalog {
    paths: CatalogPaths,
    config: Config,
    store: ContentStore,
    index: MetadataIndex,
    views: Vec<ViewRule>,
    _lock: File,
}

impl Catalog {
    /// Create a new catalog in `root` and open it.
    pub fn init(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let paths = CatalogPaths::new(root.canonicalize()?);
        if paths.exists() {
            return Err(TreeError::AlreadyInitialized(paths.root().to_path_buf()));
        }

        fs::create_dir_all(paths.movies_dir())?;
        fs::write(paths.config_path(), Config::default_toml()?)?;
        info!("Initialized catalog at {:?}", paths.root());

        Self::open(paths.root())
    }

    /// Open the catalog rooted at `root`.
    ///
    /// Waits up to `KOLEKTO_LOCK_TIMEOUT` seconds (default 30) for another
    /// process to release the tree.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let timeout_secs: u64 = std::env::var("KOLEKTO_LOCK_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_LOCK_TIMEOUT_SECS);
        Self::open_with_timeout(root, Duration::from_secs(timeout_secs))
    }

    pub fn open_with_timeout(root: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let root = root.as_ref();
        let paths = match root.canonicalize() {
            Ok(root) => CatalogPaths::new(root),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TreeError::NotACatalog(root.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        if !paths.exists() {
            return Err(TreeError::NotACatalog(paths.root().to_path_buf()));
        }

        let lock = acquire_lock(&paths.lock_path(), timeout)?;

        let config = Config::load(paths.root())?;
        let views = config
            .views
            .iter()
            .map(ViewRule::from_config)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let store = ContentStore::open(paths.movies_dir(), config.store.hash)?;
        let index = MetadataIndex::open(paths.index_path())?;
        debug!("Opened catalog at {:?} ({} views)", paths.root(), views.len());

        Ok(Self {
            paths,
            config,
            store,
            index,
            views,
            _lock: lock,
        })
    }

    /// Open the catalog enclosing `start`.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        let start = start.as_ref();
        match find_root(start) {
            Some(root) => Self::open(root),
            None => Err(TreeError::NotACatalog(start.to_path_buf())),
        }
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn paths(&self) -> &CatalogPaths {
        &self.paths
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn profile(&self) -> &'static dyn Profile {
        self.config.profile()
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn index(&self) -> &MetadataIndex {
        &self.index
    }

    pub fn views(&self) -> &[ViewRule] {
        &self.views
    }

    pub fn reconciler(&self) -> LinkReconciler<'_> {
        LinkReconciler::new(self.paths.root(), self.store.root(), &self.views)
    }

    /// Bring every view in line with the index.
    pub fn link<E: Enricher + ?Sized>(&self, enricher: &E, dry_run: bool) -> Result<ReconcileReport> {
        self.reconciler().reconcile(&self.index, enricher, dry_run)
    }

    pub fn gc(&self, dry_run: bool) -> Result<GcReport> {
        gc::collect(&self.store, &self.index, dry_run)
    }

    /// Identifier named by a command line argument: a link into the store
    /// (a view entry, say) resolves to the entry it points at, anything else
    /// is parsed as a hex identifier.
    pub fn resolve_movie(&self, arg: &str) -> Result<ContentId> {
        let path = Path::new(arg);
        if path.symlink_metadata().map(|m| m.file_type().is_symlink()).unwrap_or(false) {
            let target = fs::read_link(path)?;
            if let Some(name) = target.file_name().and_then(|n| n.to_str()) {
                return Ok(name.parse()?);
            }
        }
        Ok(arg.parse()?)
    }
}

fn acquire_lock(path: &Path, timeout: Duration) -> Result<File> {
    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    let start = Instant::now();
    loop {
        match lock_file.try_lock_exclusive() {
            Ok(()) => return Ok(lock_file),
            Err(e) if is_contended(&e) => {
                if start.elapsed() >= timeout {
                    return Err(TreeError::Locked {
                        path: path.to_path_buf(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                std::thread::sleep(LOCK_RETRY_INTERVAL);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
