//! # kolekto-cas
//!
//! Content-addressed movie store for Kolekto.
//!
//! Every imported file lives in one flat directory, named by the lowercase
//! hex digest of its bytes. Entries are either regular files (copied in) or
//! links to files that stay where they are.
//!
//! ## Directory Layout
//!
//! ```text
//! <tree>/.kolekto/movies/
//! ├── 2fd4e1c67a2d28fced849ee1bb76e7391b93eb12
//! └── de9f2c7fd25e1b3afad3e85a0bd17d9b100db4b3 -> ../../incoming/film.mkv
//! ```
//!
//! An identifier is written once and never replaced. Writes go through a
//! temporary file in the same directory and are committed with a
//! no-clobber rename, so a partially written file is never visible under
//! an identifier name.

mod hash;
pub mod link_strategy;
pub mod paths;

pub use hash::{hash_bytes, hash_reader, ContentHasher, HashAlgorithm};
pub use link_strategy::{strategy_for, symlink_file, HardlinkStrategy, LinkStrategy, SymlinkStrategy};

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Read/hash granularity. Progress callbacks fire once per chunk.
pub const CHUNK_SIZE: usize = 10 * 1024;

/// Prefix of in-flight temporary files inside the store directory.
pub const TEMP_PREFIX: &str = ".tmp-";

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum CasError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Content already in store: {id}")]
    DuplicateContent { id: ContentId },

    #[error("Entry not found: {id}")]
    NotFound { id: ContentId },

    #[error("Invalid identifier: {0:?}")]
    InvalidId(String),
}

impl CasError {
    /// The expected "already imported" outcome, as opposed to a failure.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, CasError::DuplicateContent { .. })
    }
}

pub type Result<T> = std::result::Result<T, CasError>;

/// Content identifier: lowercase hex digest of a file's bytes.
///
/// Used both as the store entry name and as the metadata index key.
///
/// Deserialization goes through [`FromStr`], so identifiers read from
/// dumps or records are always lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Wrap a store entry name as-is.
    ///
    /// Listings may contain names that are not digests (an abandoned
    /// temporary file, a file dropped in by hand); those still need an
    /// identity so garbage collection can see and remove them.
    pub fn from_entry_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for display.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }

    /// Whether this is a lowercase hex digest, as opposed to an arbitrary
    /// store entry name.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl TryFrom<String> for ContentId {
    type Error = CasError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

impl FromStr for ContentId {
    type Err = CasError;

    /// Parse user input: trimmed, lowercased, hex digits only.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CasError::InvalidId(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// How a source file enters the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestMode {
    /// Copy the bytes into the store.
    #[default]
    Copy,
    /// Hard link the source into the store.
    Hardlink,
    /// Relative symlink from the store entry to the source.
    Symlink,
}

/// Content-addressed store rooted at one flat directory.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
    algorithm: HashAlgorithm,
}

impl ContentStore {
    /// Open the store at `root`, creating the directory if it doesn't exist.
    ///
    /// The root is canonicalized so that relative link targets computed
    /// against it are stable.
    pub fn open<P: AsRef<Path>>(root: P, algorithm: HashAlgorithm) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        debug!("Opened content store at {:?} ({})", root, algorithm);
        Ok(Self { root, algorithm })
    }

    /// Get the root path of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Path where the entry for `id` lives (whether or not it exists).
    pub fn entry_path(&self, id: &ContentId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Check if an entry exists. Dangling symlink entries count as present.
    pub fn contains(&self, id: &ContentId) -> bool {
        self.entry_path(id).symlink_metadata().is_ok()
    }

    /// Store a byte stream, returning its identifier.
    pub fn put_stream<R: Read>(&self, reader: R) -> Result<ContentId> {
        self.put_stream_with_progress(reader, |_| {})
    }

    /// Store a byte stream, reporting cumulative bytes written after each
    /// chunk.
    ///
    /// Fails with [`CasError::DuplicateContent`] if the identifier is already
    /// present; the existing entry is left untouched and the temporary copy
    /// is discarded.
    #[instrument(skip(self, reader, on_progress), level = "debug")]
    pub fn put_stream_with_progress<R, F>(&self, mut reader: R, mut on_progress: F) -> Result<ContentId>
    where
        R: Read,
        F: FnMut(u64),
    {
        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.root)?;

        let mut hasher = ContentHasher::new(self.algorithm);
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            hasher.update(&buf[..n]);
            temp.write_all(&buf[..n])?;
            total += n as u64;
            on_progress(total);
        }
        temp.as_file().sync_all()?;

        let id = hasher.finalize();
        let dest = self.entry_path(&id);

        // Another writer may have committed the same digest since we started.
        match temp.persist_noclobber(&dest) {
            Ok(_) => {
                debug!("Stored {} ({} bytes)", id, total);
                Ok(id)
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                drop(e.file);
                Err(CasError::DuplicateContent { id })
            }
            Err(e) => Err(CasError::Io(e.error)),
        }
    }

    /// Hash an external file and attach it to the store without copying.
    pub fn link_external<P: AsRef<Path>>(&self, source: P, symlink: bool) -> Result<ContentId> {
        self.link_external_with_progress(source, symlink, |_| {})
    }

    /// [`Self::link_external`] with a hashing progress callback.
    #[instrument(skip(self, source, on_progress), level = "debug")]
    pub fn link_external_with_progress<P, F>(&self, source: P, symlink: bool, on_progress: F) -> Result<ContentId>
    where
        P: AsRef<Path>,
        F: FnMut(u64),
    {
        let source = source.as_ref().canonicalize()?;
        let file = File::open(&source)?;
        let id = hash_reader(self.algorithm, file, on_progress)?;

        let dest = self.entry_path(&id);
        if dest.symlink_metadata().is_ok() {
            return Err(CasError::DuplicateContent { id });
        }

        let strategy = strategy_for(symlink);
        match strategy.link_file(&source, &dest) {
            Ok(()) => {
                debug!("Linked {} -> {:?} ({})", id, source, strategy.name());
                Ok(id)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(CasError::DuplicateContent { id }),
            Err(e) => Err(CasError::Io(e)),
        }
    }

    /// Identifier the file at `path` would get, without storing it.
    pub fn hash_file<P: AsRef<Path>>(&self, path: P) -> Result<ContentId> {
        let file = File::open(path.as_ref())?;
        Ok(hash_reader(self.algorithm, file, |_| {})?)
    }

    /// Store a file from the filesystem with the given ingest mode.
    pub fn put_file<P, F>(&self, path: P, mode: IngestMode, on_progress: F) -> Result<ContentId>
    where
        P: AsRef<Path>,
        F: FnMut(u64),
    {
        match mode {
            IngestMode::Copy => {
                let file = File::open(path.as_ref())?;
                self.put_stream_with_progress(file, on_progress)
            }
            IngestMode::Hardlink => self.link_external_with_progress(path, false, on_progress),
            IngestMode::Symlink => self.link_external_with_progress(path, true, on_progress),
        }
    }

    /// Size in bytes of the stored content (follows external links).
    pub fn entry_size(&self, id: &ContentId) -> Result<u64> {
        match fs::metadata(self.entry_path(id)) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CasError::NotFound { id: id.clone() }),
            Err(e) => Err(CasError::Io(e)),
        }
    }

    /// Delete an entry.
    #[instrument(skip(self), level = "debug")]
    pub fn remove(&self, id: &ContentId) -> Result<()> {
        match fs::remove_file(self.entry_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CasError::NotFound { id: id.clone() }),
            Err(e) => Err(CasError::Io(e)),
        }
    }

    /// Every entry name in the store directory.
    ///
    /// No content validation is done; non-UTF-8 names are skipped with a
    /// warning since they can never be referenced by the index.
    pub fn list_identifiers(&self) -> Result<BTreeSet<ContentId>> {
        let mut ids = BTreeSet::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => {
                    ids.insert(ContentId::from_entry_name(name));
                }
                Err(name) => warn!("Skipping non UTF-8 store entry {:?}", name),
            }
        }
        Ok(ids)
    }

    /// Get statistics about the store.
    pub fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats::default();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            stats.entry_count += 1;
            if entry.file_type()?.is_symlink() {
                stats.symlinked_entries += 1;
                if let Ok(meta) = fs::metadata(entry.path()) {
                    stats.total_bytes += meta.len();
                } else {
                    stats.dangling_entries += 1;
                }
            } else {
                stats.total_bytes += entry.metadata()?.len();
            }
        }
        Ok(stats)
    }
}

/// Statistics about the store
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Number of entries in the store directory
    pub entry_count: u64,
    /// Total bytes reachable through the entries
    pub total_bytes: u64,
    /// Entries that are symlinks to external files
    pub symlinked_entries: u64,
    /// Symlinked entries whose target is gone
    pub dangling_entries: u64,
}
