//! In-memory backend for tests and scratch indexes.

use dashmap::DashMap;

use crate::{IndexResult, KvBackend};

#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> IndexResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn put(&self, key: &str, value: &[u8]) -> IndexResult<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> IndexResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn len(&self) -> IndexResult<usize> {
        Ok(self.entries.len())
    }

    fn keys(&self) -> IndexResult<Vec<String>> {
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }
}
