//! Commands acting on one movie, named by hash or by a link to it.

use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;
use kolekto_cas::ContentId;
use kolekto_index::{IndexError, Record, Value};
use kolekto_tree::{Catalog, Enricher, Flag};

use crate::datasource::DatasourceRegistry;

/// Attributes shown first, in this order.
const SHOW_FIRST: &[&str] = &["title", "year", "directors", "cast", "writers", "collection", "genres"];

#[derive(Args, Debug)]
pub struct MovieArgs {
    /// Movie hash, or a link to the movie in a view
    #[arg(value_name = "MOVIE")]
    input: String,
}

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Movie hash, or a link to the movie in a view (default: every movie)
    #[arg(value_name = "MOVIE")]
    input: Option<String>,
}

#[derive(Args, Debug)]
pub struct FlagArgs {
    /// Movie hash, or a link to the movie in a view
    #[arg(value_name = "MOVIE")]
    input: String,

    /// Remove the flag instead of setting it
    #[arg(short, long)]
    unflag: bool,
}

fn load(catalog: &Catalog, input: &str) -> Result<(ContentId, Record)> {
    let id = catalog
        .resolve_movie(input)
        .with_context(|| format!("Not a movie hash or link: {}", input))?;
    match catalog.index().get(&id) {
        Ok(record) => Ok((id, record)),
        Err(IndexError::NotFound { .. }) => bail!("Unknown movie hash: {}", id),
        Err(e) => Err(e.into()),
    }
}

pub fn rm(catalog: &Catalog, args: MovieArgs) -> Result<()> {
    let (id, _) = load(catalog, &args.input)?;
    catalog.index().remove(&id)?;
    println!("Removed. You need to launch gc to free space.");
    Ok(())
}

pub fn show(catalog: &Catalog, args: MovieArgs) -> Result<()> {
    let (id, record) = load(catalog, &args.input)?;
    let record = super::registry(catalog)?.attach(&id, record);
    for line in show_lines(&record) {
        println!("{}", line);
    }
    Ok(())
}

/// `key: value` lines; list values continue on padded lines below.
fn show_lines(record: &Record) -> Vec<String> {
    let mut fields = record.display_order();
    fields.sort_by_key(|(key, _)| SHOW_FIRST.iter().position(|k| k == key).unwrap_or(SHOW_FIRST.len()));

    let mut lines = Vec::new();
    for (key, value) in fields {
        let items = match value {
            Value::List(items) if items.is_empty() => continue,
            other => other.as_slice(),
        };
        lines.push(format!("{}: {}", style(key).bold(), items[0]));
        let pad = " ".repeat(key.chars().count() + 2);
        for item in &items[1..] {
            lines.push(format!("{}{}", pad, item));
        }
    }
    lines
}

pub fn refresh(catalog: &Catalog, args: RefreshArgs) -> Result<()> {
    let registry = super::registry(catalog)?;
    match args.input {
        Some(input) => {
            let (id, record) = load(catalog, &input)?;
            let record = registry.refresh(record)?;
            catalog.index().save(&id, &record)?;
            for line in show_lines(&registry.attach(&id, record)) {
                println!("{}", line);
            }
            println!("Saved.");
        }
        None => {
            let ids = catalog.index().ids()?;
            let failures = refresh_all(catalog, &registry, &ids);
            for (id, error) in &failures {
                eprintln!("{} Failed to refresh {}: {:#}", style("error:").red(), id, error);
            }
            println!("Refreshed {} movies, {} failed.", ids.len() - failures.len(), failures.len());
        }
    }
    Ok(())
}

/// Refresh and save each movie in turn; a failure is collected and the
/// remaining movies are still processed.
fn refresh_all(
    catalog: &Catalog,
    registry: &DatasourceRegistry,
    ids: &[ContentId],
) -> Vec<(ContentId, anyhow::Error)> {
    let mut failures = Vec::new();
    for id in ids {
        let result = catalog
            .index()
            .get(id)
            .map_err(anyhow::Error::from)
            .and_then(|record| registry.refresh(record))
            .and_then(|record| catalog.index().save(id, &record).map_err(Into::into));
        if let Err(e) = result {
            failures.push((id.clone(), e));
        }
    }
    failures
}

pub fn flag(catalog: &Catalog, flag: Flag, args: FlagArgs) -> Result<()> {
    let (id, mut record) = load(catalog, &args.input)?;
    flag.apply(&mut record, args.unflag);
    catalog.index().save(&id, &record)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::Datasource;

    /// Adds a genre, or fails for the movie titled "Broken".
    struct Genres;

    impl Datasource for Genres {
        fn name(&self) -> &str {
            "genres"
        }

        fn search(&self, _title: &str, _year: Option<i64>) -> Result<Vec<Record>> {
            Ok(Vec::new())
        }

        fn refresh(&self, record: &Record) -> Result<Option<Record>> {
            if record.text("title") == Some("Broken") {
                bail!("provider unavailable");
            }
            let mut extra = Record::new();
            extra.insert("genres", vec!["Drama"]);
            Ok(Some(extra))
        }
    }

    fn movie(title: &str) -> Record {
        let mut record = Record::new();
        record.insert("title", title);
        record
    }

    #[test]
    fn test_refresh_all_keeps_going_after_a_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let catalog = Catalog::init(temp.path()).unwrap();
        let broken: ContentId = "aa".parse().unwrap();
        let good: ContentId = "bb".parse().unwrap();
        catalog.index().save(&broken, &movie("Broken")).unwrap();
        catalog.index().save(&good, &movie("Good")).unwrap();

        let registry = DatasourceRegistry::from_sources(vec![Box::new(Genres)]);
        let ids = catalog.index().ids().unwrap();
        let failures = refresh_all(&catalog, &registry, &ids);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, broken);
        assert!(failures[0].1.to_string().contains("provider unavailable"));
        assert!(catalog.index().get(&good).unwrap().contains_key("genres"));
        assert!(!catalog.index().get(&broken).unwrap().contains_key("genres"));
    }

    #[test]
    fn test_show_order() {
        let mut record = Record::new();
        record.insert("_externals", vec!["abc"]);
        record.insert("runtime", 120);
        record.insert("genres", Vec::<String>::new());
        record.insert("directors", vec!["A", "B"]);
        record.insert("title", "Foo");

        console::set_colors_enabled(false);
        let lines = show_lines(&record);
        assert_eq!(
            lines,
            vec!["title: Foo", "directors: A", "           B", "runtime: 120", "_externals: abc"]
        );
    }
}
