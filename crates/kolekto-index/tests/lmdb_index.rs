//! Metadata index persistence through the LMDB backend.

use kolekto_cas::ContentId;
use kolekto_index::{IndexError, MetadataIndex, Record};
use tempfile::TempDir;

fn id(s: &str) -> ContentId {
    s.parse().unwrap()
}

#[test]
fn test_records_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("metadata.db");

    {
        let index = MetadataIndex::open(&path).unwrap();
        let record: Record = serde_json::from_str(
            r#"{"title":"Foo","year":2001,"directors":["A","B"],"_externals":["cd34"]}"#,
        )
        .unwrap();
        index.save(&id("ab12"), &record).unwrap();
        index.save(&id("ef56"), &Record::new()).unwrap();
    }

    let index = MetadataIndex::open(&path).unwrap();
    assert_eq!(index.count().unwrap(), 2);

    let record = index.get(&id("ab12")).unwrap();
    assert_eq!(record.text("title"), Some("Foo"));
    assert_eq!(record.externals(), vec![id("cd34")]);

    let mut ids = index.ids().unwrap();
    ids.sort();
    assert_eq!(ids, vec![id("ab12"), id("ef56")]);
}

#[test]
fn test_remove_then_iterate() {
    let temp = TempDir::new().unwrap();
    let index = MetadataIndex::open(temp.path().join("metadata.db")).unwrap();

    for hex in ["aa", "bb", "cc"] {
        let mut record = Record::new();
        record.insert("title", hex.to_uppercase());
        index.save(&id(hex), &record).unwrap();
    }
    index.remove(&id("bb")).unwrap();

    let titles: Vec<String> = index
        .iter()
        .unwrap()
        .map(|item| item.unwrap().1.text("title").unwrap().to_string())
        .collect();
    assert_eq!(titles.len(), 2);
    assert!(!titles.contains(&"BB".to_string()));

    assert!(matches!(
        index.get(&id("bb")),
        Err(IndexError::NotFound { .. })
    ));
}

#[test]
fn test_dump_into_fresh_index() {
    let temp = TempDir::new().unwrap();
    let source = MetadataIndex::open(temp.path().join("a.db")).unwrap();
    let mut record = Record::new();
    record.insert("title", "Foo");
    record.insert("watched", true);
    source.save(&id("0123abcd"), &record).unwrap();

    let json = serde_json::to_string_pretty(&source.dump().unwrap()).unwrap();

    let target = MetadataIndex::open(temp.path().join("b.db")).unwrap();
    let restored = target.restore(serde_json::from_str::<Vec<_>>(&json).unwrap()).unwrap();
    assert_eq!(restored, 1);
    assert!(target.get(&id("0123abcd")).unwrap().flag("watched"));
}
