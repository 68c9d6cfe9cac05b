//! View reconciliation against a real catalog tree.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};

use kolekto_cas::ContentId;
use kolekto_config::testing::TestCatalog;
use kolekto_config::{Config, ViewConfig};
use kolekto_index::Record;
use kolekto_tree::{Catalog, Enricher, NoEnrichment};

fn record(json: &str) -> Record {
    serde_json::from_str(json).unwrap()
}

fn import(catalog: &Catalog, content: &[u8], json: &str) -> ContentId {
    let id = catalog.store().put_stream(content).unwrap();
    catalog.index().save(&id, &record(json)).unwrap();
    id
}

fn config_with_view(name: &str, pattern: &str) -> Config {
    Config {
        views: vec![ViewConfig {
            name: name.to_string(),
            root: None,
            patterns: vec![pattern.to_string()],
        }],
        ..Config::default()
    }
}

#[test]
fn test_single_link_created_then_pruned() {
    let env = TestCatalog::new().unwrap();
    let catalog = Catalog::open(&env.tree_root).unwrap();
    let id = import(&catalog, b"foo movie", r#"{"title":"Foo","year":2001,"ext":"mkv"}"#);

    let report = catalog.link(&NoEnrichment, false).unwrap();
    assert_eq!(report.to_create, vec![(PathBuf::from("Titles/Foo.mkv"), id.clone())]);
    assert!(report.to_delete.is_empty());
    assert!(report.failures.is_empty());

    let link = env.tree_root.join("Titles/Foo.mkv");
    assert_eq!(
        fs::read_link(&link).unwrap(),
        Path::new("../.kolekto/movies").join(id.as_str())
    );
    assert_eq!(fs::read(&link).unwrap(), b"foo movie");

    // Nothing changed: nothing to do.
    assert!(catalog.link(&NoEnrichment, false).unwrap().is_converged());

    catalog.index().remove(&id).unwrap();
    let report = catalog.link(&NoEnrichment, false).unwrap();
    assert_eq!(report.to_delete, vec![(PathBuf::from("Titles/Foo.mkv"), id)]);
    assert!(link.symlink_metadata().is_err());
    assert!(env.tree_root.join("Titles").is_dir());
}

#[test]
fn test_list_fields_fan_out_and_prune_subdirectories() {
    let config = config_with_view("Directors", "{directors}/{title}.{ext}");
    let env = TestCatalog::with_config(&config).unwrap();
    let catalog = Catalog::open(&env.tree_root).unwrap();
    let id = import(&catalog, b"x", r#"{"title":"Foo","ext":"avi","directors":["A","B"]}"#);

    let report = catalog.link(&NoEnrichment, false).unwrap();
    assert_eq!(report.to_create.len(), 2);
    assert!(env.tree_root.join("Directors/A/Foo.avi").symlink_metadata().is_ok());
    assert_eq!(
        fs::read_link(env.tree_root.join("Directors/B/Foo.avi")).unwrap(),
        Path::new("../../.kolekto/movies").join(id.as_str())
    );

    catalog.index().remove(&id).unwrap();
    let report = catalog.link(&NoEnrichment, false).unwrap();
    assert_eq!(report.to_delete.len(), 2);
    assert!(!env.tree_root.join("Directors/A").exists());
    assert!(!env.tree_root.join("Directors/B").exists());
    assert!(env.tree_root.join("Directors").is_dir());
    assert_eq!(report.removed_dirs.len(), 2);
}

#[test]
fn test_retarget_and_stale_links() {
    let env = TestCatalog::new().unwrap();
    let catalog = Catalog::open(&env.tree_root).unwrap();
    let old = import(&catalog, b"old", r#"{"title":"Foo","ext":"mkv"}"#);
    catalog.link(&NoEnrichment, false).unwrap();

    // Same title, other content: the path now points elsewhere.
    catalog.index().remove(&old).unwrap();
    let new = import(&catalog, b"new", r#"{"title":"Foo","ext":"mkv"}"#);

    // A link that points outside the store and one left dangling.
    std::os::unix::fs::symlink(&env.incoming, env.tree_root.join("Titles/outside")).unwrap();
    std::os::unix::fs::symlink("../.kolekto/movies/dead", env.tree_root.join("Titles/Gone.mkv")).unwrap();

    let report = catalog.link(&NoEnrichment, false).unwrap();
    assert_eq!(report.to_create, vec![(PathBuf::from("Titles/Foo.mkv"), new.clone())]);
    let deleted: Vec<_> = report.to_delete.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(
        deleted,
        vec![
            PathBuf::from("Titles/Foo.mkv"),
            PathBuf::from("Titles/Gone.mkv"),
            PathBuf::from("Titles/outside"),
        ]
    );
    assert_eq!(fs::read(env.tree_root.join("Titles/Foo.mkv")).unwrap(), b"new");
    assert!(catalog.link(&NoEnrichment, false).unwrap().is_converged());
}

#[test]
fn test_foreign_files_are_reported_not_deleted() {
    let env = TestCatalog::new().unwrap();
    let catalog = Catalog::open(&env.tree_root).unwrap();
    env.create_file("Titles/notes.txt", b"mine").unwrap();
    fs::create_dir_all(env.tree_root.join("Titles/empty/nested")).unwrap();

    let report = catalog.link(&NoEnrichment, false).unwrap();
    assert_eq!(report.foreign, vec![PathBuf::from("Titles/notes.txt")]);
    assert!(env.tree_root.join("Titles/notes.txt").is_file());
    assert!(!env.tree_root.join("Titles/empty").exists());
}

#[test]
fn test_collision_keeps_first_mapping() {
    let env = TestCatalog::new().unwrap();
    let catalog = Catalog::open(&env.tree_root).unwrap();
    let first = import(&catalog, b"one", r#"{"title":"Foo","ext":"mkv"}"#);
    let second = import(&catalog, b"two", r#"{"title":"Foo","ext":"mkv"}"#);
    let (kept, dropped) = if first < second { (first, second) } else { (second, first) };

    let report = catalog.link(&NoEnrichment, false).unwrap();
    assert_eq!(report.to_create.len(), 1);
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].kept, kept);
    assert_eq!(report.collisions[0].dropped, dropped);
}

#[test]
fn test_dry_run_touches_nothing() {
    let env = TestCatalog::new().unwrap();
    let catalog = Catalog::open(&env.tree_root).unwrap();
    import(&catalog, b"foo", r#"{"title":"Foo","ext":"mkv"}"#);

    let report = catalog.link(&NoEnrichment, true).unwrap();
    assert_eq!(report.to_create.len(), 1);
    assert!(!env.tree_root.join("Titles").exists());

    let report = catalog.link(&NoEnrichment, true).unwrap();
    assert_eq!(report.to_create.len(), 1);
}

#[test]
fn test_unsafe_expansions_are_rejected() {
    let env = TestCatalog::new().unwrap();
    let catalog = Catalog::open(&env.tree_root).unwrap();
    import(&catalog, b"a", r#"{"title":"..","ext":"mkv"}"#);
    import(&catalog, b"b", r#"{"title":"","ext":""}"#);

    let report = catalog.link(&NoEnrichment, false).unwrap();
    // "...mkv" is an ordinary file name; "." is not.
    let created: Vec<_> = report.to_create.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(created, vec![PathBuf::from("Titles/...mkv")]);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].expansion, ".");
    assert_eq!(report.rejected[0].view, "Titles");
}

#[test]
fn test_malformed_index_keys_get_no_links() {
    let env = TestCatalog::new().unwrap();
    let catalog = Catalog::open(&env.tree_root).unwrap();
    let evil = ContentId::from_entry_name("../../../etc/passwd");
    catalog.index().save(&evil, &record(r#"{"title":"Evil","ext":"txt"}"#)).unwrap();
    let good = import(&catalog, b"good", r#"{"title":"Good","ext":"mkv"}"#);

    let report = catalog.link(&NoEnrichment, false).unwrap();
    assert_eq!(report.to_create, vec![(PathBuf::from("Titles/Good.mkv"), good)]);
    assert_eq!(report.invalid_ids, vec![evil]);
    assert!(env.tree_root.join("Titles/Evil.txt").symlink_metadata().is_err());
}

struct TagExt;

impl Enricher for TagExt {
    fn attach(&self, _id: &ContentId, mut record: Record) -> Record {
        if !record.contains_key("ext") {
            record.insert("ext", "mkv");
        }
        record
    }
}

#[test]
fn test_enricher_runs_before_expansion() {
    let env = TestCatalog::new().unwrap();
    let catalog = Catalog::open(&env.tree_root).unwrap();
    let id = import(&catalog, b"bare", r#"{"title":"Bare"}"#);

    assert!(catalog.link(&NoEnrichment, true).unwrap().to_create.is_empty());
    let report = catalog.link(&TagExt, false).unwrap();
    assert_eq!(report.to_create, vec![(PathBuf::from("Titles/Bare.mkv"), id)]);
}
