//! Collection statistics.

use std::collections::BTreeMap;

use kolekto_cas::ContentStore;
use kolekto_index::{KvBackend, MetadataIndex, Record, Scalar, Value};

use crate::link::Enricher;
use crate::Result;

/// Label used when a record has no quality/container attribute.
pub const NOT_AVAILABLE: &str = "n/a";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionStats {
    pub movies: usize,
    /// Sum of `runtime` attributes, in minutes
    pub total_runtime_minutes: u64,
    /// Bytes reachable through the store entries of indexed movies
    pub total_size: u64,
    /// Indexed movies with no readable store entry
    pub missing_entries: usize,
    pub genres: BTreeMap<String, usize>,
    pub directors: BTreeMap<String, usize>,
    pub quality: BTreeMap<String, usize>,
    pub container: BTreeMap<String, usize>,
}

impl CollectionStats {
    /// Record one movie's attributes and entry size.
    pub fn add(&mut self, record: &Record, size: Option<u64>) {
        self.movies += 1;
        match size {
            Some(size) => self.total_size += size,
            None => self.missing_entries += 1,
        }
        if let Some(minutes) = record
            .get("runtime")
            .and_then(Value::as_scalar)
            .and_then(Scalar::as_f64)
        {
            if minutes > 0.0 {
                self.total_runtime_minutes += minutes.round() as u64;
            }
        }
        count_each(&mut self.genres, record.get("genres"));
        count_each(&mut self.directors, record.get("directors"));
        *self.quality.entry(label(record, "quality")).or_default() += 1;
        *self.container.entry(label(record, "container")).or_default() += 1;
    }
}

fn count_each(counter: &mut BTreeMap<String, usize>, value: Option<&Value>) {
    if let Some(value) = value {
        for item in value.as_slice() {
            *counter.entry(item.to_string()).or_default() += 1;
        }
    }
}

fn label(record: &Record, key: &str) -> String {
    record
        .get(key)
        .map(|v| v.join(", "))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// The `limit` most frequent entries, most frequent first; ties are broken
/// alphabetically.
pub fn top(counter: &BTreeMap<String, usize>, limit: Option<usize>) -> Vec<(&str, usize)> {
    let mut items: Vec<(&str, usize)> = counter.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

/// Walk the whole index and gather statistics.
pub fn collection_stats<B, E>(store: &ContentStore, index: &MetadataIndex<B>, enricher: &E) -> Result<CollectionStats>
where
    B: KvBackend,
    E: Enricher + ?Sized,
{
    let mut stats = CollectionStats::default();
    for item in index.iter()? {
        let (id, record) = item?;
        let record = enricher.attach(&id, record);
        let size = store.entry_size(&id).ok();
        stats.add(&record, size);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::NoEnrichment;
    use kolekto_cas::HashAlgorithm;
    use tempfile::TempDir;

    fn record(json: &str) -> Record {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_accumulates_attributes() {
        let mut stats = CollectionStats::default();
        stats.add(
            &record(r#"{"runtime":120,"genres":["Action","Drama"],"directors":["A"],"quality":"720p"}"#),
            Some(10),
        );
        stats.add(&record(r#"{"runtime":90,"genres":["Drama"],"container":"mkv"}"#), None);

        assert_eq!(stats.movies, 2);
        assert_eq!(stats.total_runtime_minutes, 210);
        assert_eq!(stats.total_size, 10);
        assert_eq!(stats.missing_entries, 1);
        assert_eq!(top(&stats.genres, Some(3)), vec![("Drama", 2), ("Action", 1)]);
        assert_eq!(stats.quality.get(NOT_AVAILABLE), Some(&1));
        assert_eq!(stats.container.get("mkv"), Some(&1));
    }

    #[test]
    fn test_top_limit_and_ties() {
        let counter: BTreeMap<String, usize> =
            [("b".to_string(), 1), ("a".to_string(), 1), ("c".to_string(), 5)].into();
        assert_eq!(top(&counter, Some(2)), vec![("c", 5), ("a", 1)]);
        assert_eq!(top(&counter, None).len(), 3);
    }

    #[test]
    fn test_collection_stats_reads_entry_sizes() {
        let temp = TempDir::new().unwrap();
        let store = ContentStore::open(temp.path().join("movies"), HashAlgorithm::Sha1).unwrap();
        let index = MetadataIndex::in_memory();
        let id = store.put_stream(&b"twelve bytes"[..]).unwrap();
        index.save(&id, &record(r#"{"title":"Foo","runtime":95}"#)).unwrap();

        let stats = collection_stats(&store, &index, &NoEnrichment).unwrap();
        assert_eq!(stats.movies, 1);
        assert_eq!(stats.total_size, 12);
        assert_eq!(stats.total_runtime_minutes, 95);
    }
}
