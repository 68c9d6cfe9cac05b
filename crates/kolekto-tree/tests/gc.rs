//! Garbage collection and index reports on a real catalog tree.

use std::collections::BTreeSet;

use kolekto_config::testing::TestCatalog;
use kolekto_index::Record;
use kolekto_tree::{find_duplicates, Catalog};

fn titled(title: &str, year: i64) -> Record {
    let mut record = Record::new();
    record.insert("title", title);
    record.insert("year", year);
    record
}

#[test]
fn test_gc_removes_exactly_unreferenced_entries() {
    let env = TestCatalog::new().unwrap();
    let catalog = Catalog::open(&env.tree_root).unwrap();
    let store = catalog.store();

    let a = store.put_stream(&b"a"[..]).unwrap();
    let b = store.put_stream(&b"b"[..]).unwrap();
    let c = store.put_stream(&b"c"[..]).unwrap();
    catalog.index().save(&a, &titled("A", 2001)).unwrap();
    catalog.index().save(&b, &titled("B", 2002)).unwrap();

    let preview = catalog.gc(true).unwrap();
    assert_eq!(preview.removed, BTreeSet::from([c.clone()]));
    assert!(store.contains(&c));

    let report = catalog.gc(false).unwrap();
    assert_eq!(report.removed, BTreeSet::from([c.clone()]));
    assert!(!store.contains(&c));

    let again = catalog.gc(false).unwrap();
    assert!(again.removed.is_empty());
    assert_eq!(again.present, BTreeSet::from([a, b]));
}

#[test]
fn test_gc_sweeps_stray_entries() {
    let env = TestCatalog::new().unwrap();
    env.create_store_entry(".tmp-abandoned", b"partial").unwrap();
    let catalog = Catalog::open(&env.tree_root).unwrap();

    let report = catalog.gc(false).unwrap();
    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.reclaimable_bytes, 7);
    assert!(catalog.store().list_identifiers().unwrap().is_empty());
}

#[test]
fn test_duplicates_across_the_index() {
    let env = TestCatalog::new().unwrap();
    let catalog = Catalog::open(&env.tree_root).unwrap();
    let first = catalog.store().put_stream(&b"cut one"[..]).unwrap();
    let second = catalog.store().put_stream(&b"cut two"[..]).unwrap();
    catalog.index().save(&first, &titled("Foo", 2001)).unwrap();
    catalog.index().save(&second, &titled("Foo", 2001)).unwrap();

    let records = catalog
        .index()
        .iter()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let groups = find_duplicates(records);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].title, "Foo");
    assert_eq!(groups[0].year, Some(2001));
    assert_eq!(groups[0].ids.iter().collect::<BTreeSet<_>>(), BTreeSet::from([&first, &second]));
}
