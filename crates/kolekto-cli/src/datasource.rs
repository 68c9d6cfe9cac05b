//! Metadata providers.
//!
//! Providers are listed under `[[datasource]]` in the tree configuration
//! and queried in that order. Search results from every provider are
//! offered at import; refresh results are merged into the chosen record;
//! attach runs whenever a record is read back for display or linking.

use anyhow::{bail, Result};
use kolekto_cas::ContentId;
use kolekto_config::DatasourceConfig;
use kolekto_index::Record;
use kolekto_tree::{title_case, Enricher};

/// A metadata provider.
pub trait Datasource {
    fn name(&self) -> &str;

    /// Candidate records for a title (and year, when known).
    fn search(&self, title: &str, year: Option<i64>) -> Result<Vec<Record>>;

    /// Extra attributes for a chosen record, merged over it.
    fn refresh(&self, _record: &Record) -> Result<Option<Record>> {
        Ok(None)
    }

    /// Derived attributes added on read; never persisted.
    fn attach(&self, _id: &ContentId, record: Record) -> Record {
        record
    }
}

/// Offline provider: the title and year guessed from the file name are
/// the only candidate.
pub struct FilenameDatasource;

impl Datasource for FilenameDatasource {
    fn name(&self) -> &str {
        "filename"
    }

    fn search(&self, title: &str, year: Option<i64>) -> Result<Vec<Record>> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(Vec::new());
        }
        let mut record = Record::new();
        record.insert("title", title);
        if let Some(year) = year {
            record.insert("year", year);
        }
        Ok(vec![record])
    }
}

/// One search result together with the provider that produced it.
pub struct Candidate<'a> {
    pub datasource: &'a str,
    pub record: Record,
}

/// The configured providers, in configuration order.
pub struct DatasourceRegistry {
    sources: Vec<Box<dyn Datasource>>,
}

impl DatasourceRegistry {
    pub fn from_config(configs: &[DatasourceConfig]) -> Result<Self> {
        let mut sources: Vec<Box<dyn Datasource>> = Vec::with_capacity(configs.len());
        for config in configs {
            match config.name.as_str() {
                "filename" => sources.push(Box::new(FilenameDatasource)),
                other => bail!("Bad datasource {:?}", other),
            }
        }
        Ok(Self::from_sources(sources))
    }

    pub fn from_sources(sources: Vec<Box<dyn Datasource>>) -> Self {
        Self { sources }
    }

    pub fn search(&self, title: &str, year: Option<i64>) -> Result<Vec<Candidate<'_>>> {
        let mut candidates = Vec::new();
        for source in &self.sources {
            for record in source.search(title, year)? {
                candidates.push(Candidate {
                    datasource: source.name(),
                    record,
                });
            }
        }
        Ok(candidates)
    }

    pub fn refresh(&self, mut record: Record) -> Result<Record> {
        for source in &self.sources {
            if let Some(refreshed) = source.refresh(&record)? {
                for (key, value) in refreshed.iter() {
                    record.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(record)
    }
}

impl Enricher for DatasourceRegistry {
    fn attach(&self, id: &ContentId, record: Record) -> Record {
        self.sources
            .iter()
            .fold(record, |record, source| source.attach(id, record))
    }
}

/// Split a file stem into a cleaned title and a release year.
///
/// The year is the last `19xx`/`2xxx` run preceded by at least one
/// character; everything before it, dots turned to spaces, is the title.
/// Stems without a year come back unchanged.
pub fn clean_title(stem: &str) -> (String, Option<i64>) {
    let bytes = stem.as_bytes();
    if bytes.len() < 5 {
        return (stem.to_string(), None);
    }
    for start in (1..=bytes.len() - 4).rev() {
        // ASCII digits are always on a char boundary.
        if !is_year(&bytes[start..start + 4]) {
            continue;
        }
        let title = stem[..start].replace('.', " ");
        let year = stem[start..start + 4].parse().ok();
        return (title_case(title.trim()), year);
    }
    (stem.to_string(), None)
}

fn is_year(digits: &[u8]) -> bool {
    digits.iter().all(u8::is_ascii_digit)
        && match digits[0] {
            b'1' => digits[1] == b'9',
            b'2' => true,
            _ => false,
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config(name: &str) -> DatasourceConfig {
        DatasourceConfig {
            name: name.to_string(),
            options: BTreeMap::new(),
        }
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("Some.Movie.2001"), ("Some Movie".to_string(), Some(2001)));
        assert_eq!(
            clean_title("the.matrix.1999.1080p.x264"),
            ("The Matrix".to_string(), Some(1999))
        );
        // Greedy: the last year wins.
        assert_eq!(clean_title("Movie.2001.2012"), ("Movie 2001".to_string(), Some(2012)));
    }

    #[test]
    fn test_clean_title_without_year() {
        assert_eq!(clean_title("home_video"), ("home_video".to_string(), None));
        assert_eq!(clean_title("1999"), ("1999".to_string(), None));
        assert_eq!(clean_title("Heat.1895"), ("Heat.1895".to_string(), None));
    }

    #[test]
    fn test_registry_search() {
        let registry = DatasourceRegistry::from_config(&[config("filename")]).unwrap();
        let candidates = registry.search("Foo", Some(2001)).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].datasource, "filename");
        assert_eq!(candidates[0].record.text("title"), Some("Foo"));
        assert!(registry.search("  ", None).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_datasource_is_an_error() {
        let result = DatasourceRegistry::from_config(&[config("filename"), config("imdb")]);
        assert!(result.is_err());
    }

    struct Tagger;

    impl Datasource for Tagger {
        fn name(&self) -> &str {
            "tagger"
        }

        fn search(&self, _title: &str, _year: Option<i64>) -> Result<Vec<Record>> {
            Ok(Vec::new())
        }

        fn refresh(&self, _record: &Record) -> Result<Option<Record>> {
            let mut extra = Record::new();
            extra.insert("genres", vec!["Drama"]);
            Ok(Some(extra))
        }

        fn attach(&self, id: &ContentId, mut record: Record) -> Record {
            record.insert("_short", id.short());
            record
        }
    }

    #[test]
    fn test_refresh_and_attach_chain() {
        let registry = DatasourceRegistry::from_sources(vec![Box::new(FilenameDatasource), Box::new(Tagger)]);
        let mut record = Record::new();
        record.insert("title", "Foo");

        let record = registry.refresh(record).unwrap();
        assert!(record.contains_key("genres"));

        let id: ContentId = "abcdef".parse().unwrap();
        let record = registry.attach(&id, record);
        assert_eq!(record.text("_short"), Some("abcdef"));
    }
}
