//! # kolekto-index
//!
//! Metadata index for Kolekto catalogs: content identifier → movie record.
//!
//! The index is the source of truth for which store entries the catalog
//! knows about. Records are stored as plain JSON values in a single-file
//! key-value database.
//!
//! ## Storage Backends
//!
//! - `LmdbBackend`: LMDB via heed, one `metadata.db` file (default)
//! - `MemoryBackend`: DashMap, nothing persisted
//!
//! Saving a record is not transactional with storing its content: a crash
//! between the two leaves an orphan store entry, which garbage collection
//! removes later.

pub mod lmdb;
pub mod memory;
pub mod record;

pub use lmdb::LmdbBackend;
pub use memory::MemoryBackend;
pub use record::{Record, Scalar, Value, EXTERNALS_KEY};

use std::io;
use std::path::Path;

use kolekto_cas::ContentId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Index errors
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown movie: {id}")]
    NotFound { id: ContentId },

    #[error("Record {id} is corrupted: {reason}")]
    Corrupted { id: ContentId, reason: String },
}

pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Minimal key-value engine the index runs on.
///
/// Writes (`put`/`delete`) must be durable before they return.
pub trait KvBackend {
    fn get(&self, key: &str) -> IndexResult<Option<Vec<u8>>>;

    fn put(&self, key: &str, value: &[u8]) -> IndexResult<()>;

    /// Returns whether the key existed.
    fn delete(&self, key: &str) -> IndexResult<bool>;

    fn len(&self) -> IndexResult<usize>;

    /// Snapshot of every key, in backend storage order.
    fn keys(&self) -> IndexResult<Vec<String>>;
}

/// One element of a JSON dump: `{"hash": ..., "movie": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpEntry {
    pub hash: ContentId,
    pub movie: Record,
}

/// Persistent identifier → record mapping.
pub struct MetadataIndex<B: KvBackend = LmdbBackend> {
    backend: B,
}

impl MetadataIndex<LmdbBackend> {
    /// Open (or create) the index database file.
    pub fn open<P: AsRef<Path>>(path: P) -> IndexResult<Self> {
        Ok(Self::with_backend(LmdbBackend::open(path)?))
    }
}

impl MetadataIndex<MemoryBackend> {
    pub fn in_memory() -> Self {
        Self::with_backend(MemoryBackend::new())
    }
}

impl<B: KvBackend> MetadataIndex<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load the record stored under `id`.
    pub fn get(&self, id: &ContentId) -> IndexResult<Record> {
        match self.backend.get(id.as_str())? {
            Some(bytes) => decode(id, &bytes),
            None => Err(IndexError::NotFound { id: id.clone() }),
        }
    }

    /// Write a record, replacing any previous one. Durable on return.
    pub fn save(&self, id: &ContentId, record: &Record) -> IndexResult<()> {
        let bytes = serde_json::to_vec(record)?;
        self.backend.put(id.as_str(), &bytes)?;
        debug!("Saved record {}", id);
        Ok(())
    }

    pub fn remove(&self, id: &ContentId) -> IndexResult<()> {
        if self.backend.delete(id.as_str())? {
            debug!("Removed record {}", id);
            Ok(())
        } else {
            Err(IndexError::NotFound { id: id.clone() })
        }
    }

    pub fn count(&self) -> IndexResult<usize> {
        self.backend.len()
    }

    pub fn contains(&self, id: &ContentId) -> IndexResult<bool> {
        Ok(self.backend.get(id.as_str())?.is_some())
    }

    /// Every identifier in the index.
    pub fn ids(&self) -> IndexResult<Vec<ContentId>> {
        Ok(self
            .backend
            .keys()?
            .into_iter()
            .map(ContentId::from_entry_name)
            .collect())
    }

    /// Lazily iterate over all `(identifier, record)` pairs.
    ///
    /// Order is the backend's storage order and carries no meaning. Each
    /// call starts a fresh pass.
    pub fn iter(&self) -> IndexResult<Records<'_, B>> {
        Ok(Records {
            index: self,
            keys: self.backend.keys()?.into_iter(),
        })
    }

    /// Whole index as dump entries.
    pub fn dump(&self) -> IndexResult<Vec<DumpEntry>> {
        self.iter()?
            .map(|item| item.map(|(hash, movie)| DumpEntry { hash, movie }))
            .collect()
    }

    /// Save every entry of a dump, returning how many were written.
    pub fn restore<I>(&self, entries: I) -> IndexResult<usize>
    where
        I: IntoIterator<Item = DumpEntry>,
    {
        let mut count = 0;
        for entry in entries {
            self.save(&entry.hash, &entry.movie)?;
            count += 1;
        }
        Ok(count)
    }
}

fn decode(id: &ContentId, bytes: &[u8]) -> IndexResult<Record> {
    serde_json::from_slice(bytes).map_err(|e| IndexError::Corrupted {
        id: id.clone(),
        reason: e.to_string(),
    })
}

/// Iterator returned by [`MetadataIndex::iter`].
pub struct Records<'a, B: KvBackend> {
    index: &'a MetadataIndex<B>,
    keys: std::vec::IntoIter<String>,
}

impl<B: KvBackend> Iterator for Records<'_, B> {
    type Item = IndexResult<(ContentId, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        for key in self.keys.by_ref() {
            let id = ContentId::from_entry_name(key);
            match self.index.backend.get(id.as_str()) {
                Ok(Some(bytes)) => return Some(decode(&id, &bytes).map(|r| (id, r))),
                // Removed since the key snapshot was taken.
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.keys.len()))
    }
}
