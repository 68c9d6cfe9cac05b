//! LMDB-backed key-value store for the metadata index.
//!
//! The environment is opened in single-file mode (`NO_SUB_DIR`): the data
//! lives in one file (`metadata.db`) next to LMDB's `metadata.db-lock`.
//! Every write is its own transaction and LMDB commits are synchronous, so
//! a `put` or `delete` is on disk when it returns.

use std::path::Path;

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvFlags, EnvOpenOptions};
use tracing::debug;

use crate::{IndexResult, KvBackend};

/// LMDB key-value backend
pub struct LmdbBackend {
    /// LMDB environment
    env: Env,

    /// Identifier → serialized record
    movies_db: Database<Str, Bytes>,
}

impl LmdbBackend {
    /// Default LMDB map size: 256MB (expandable)
    const DEFAULT_MAP_SIZE: usize = 256 * 1024 * 1024;

    /// Open or create the database file at `path`.
    ///
    /// The parent directory must exist.
    pub fn open<P: AsRef<Path>>(path: P) -> IndexResult<Self> {
        let path = path.as_ref();

        // Open LMDB environment
        let env = unsafe {
            let mut options = EnvOpenOptions::new();
            options.map_size(Self::DEFAULT_MAP_SIZE).max_dbs(1);
            options.flags(EnvFlags::NO_SUB_DIR);
            options.open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let movies_db = env.create_database(&mut wtxn, Some("movies"))?;
        wtxn.commit()?;

        debug!("Opened LMDB index at {:?}", path);

        Ok(Self { env, movies_db })
    }

    /// Sync/flush LMDB to disk
    pub fn sync(&self) -> IndexResult<()> {
        self.env.force_sync()?;
        Ok(())
    }
}

impl KvBackend for LmdbBackend {
    fn get(&self, key: &str) -> IndexResult<Option<Vec<u8>>> {
        let rtxn = self.env.read_txn()?;
        Ok(self.movies_db.get(&rtxn, key)?.map(<[u8]>::to_vec))
    }

    fn put(&self, key: &str, value: &[u8]) -> IndexResult<()> {
        let mut wtxn = self.env.write_txn()?;
        self.movies_db.put(&mut wtxn, key, value)?;
        wtxn.commit()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> IndexResult<bool> {
        let mut wtxn = self.env.write_txn()?;
        let existed = self.movies_db.delete(&mut wtxn, key)?;
        wtxn.commit()?;
        Ok(existed)
    }

    fn len(&self) -> IndexResult<usize> {
        let rtxn = self.env.read_txn()?;
        Ok(self.movies_db.len(&rtxn)? as usize)
    }

    fn keys(&self) -> IndexResult<Vec<String>> {
        let rtxn = self.env.read_txn()?;
        let mut keys = Vec::new();
        for item in self.movies_db.iter(&rtxn)? {
            let (key, _) = item?;
            keys.push(key.to_string());
        }
        Ok(keys)
    }
}
