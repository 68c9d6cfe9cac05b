//! Whole-collection listings and reports.

use std::collections::HashMap;

use anyhow::Result;
use console::style;
use kolekto_cas::ContentId;
use kolekto_index::Record;
use kolekto_tree::stats::{top, NOT_AVAILABLE};
use kolekto_tree::{collection_stats, Catalog, Enricher};

use crate::format::{format_bytes, format_runtime};

fn records(catalog: &Catalog) -> Result<Vec<(ContentId, Record)>> {
    Ok(catalog.index().iter()?.collect::<Result<Vec<_>, _>>()?)
}

pub fn list(catalog: &Catalog) -> Result<()> {
    let order = catalog.profile().default_sort_order();
    let mut movies = records(catalog)?;
    movies.sort_by(|(_, a), (_, b)| super::compare_records(a, b, order));

    for (id, record) in &movies {
        println!("{} {}", style(format!(" {} ", id)).reverse().bold(), super::summary(catalog, record)?);
    }
    Ok(())
}

pub fn stats(catalog: &Catalog) -> Result<()> {
    let registry = super::registry(catalog)?;
    let stats = collection_stats(catalog.store(), catalog.index(), &registry)?;

    println!("{} {}", style("Number of movies:").bold(), stats.movies);
    println!("{} {}", style("Total runtime:").bold(), format_runtime(stats.total_runtime_minutes));
    println!("{} {}", style("Total size:").bold(), format_bytes(stats.total_size));
    println!("{} {}", style("Genres top3:").bold(), format_top(&top(&stats.genres, Some(3))));
    println!("{} {}", style("Director top3:").bold(), format_top(&top(&stats.directors, Some(3))));
    println!("{} {}", style("Quality:").bold(), format_top(&top(&stats.quality, None)));
    println!("{} {}", style("Container:").bold(), format_top(&top(&stats.container, None)));
    if stats.missing_entries > 0 {
        eprintln!("{} movies have no readable store entry.", stats.missing_entries);
    }
    Ok(())
}

fn format_top(items: &[(&str, usize)]) -> String {
    items
        .iter()
        .map(|(name, count)| format!("{} ({})", name, count))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn find_duplicates(catalog: &Catalog) -> Result<()> {
    let registry = super::registry(catalog)?;
    let movies: Vec<(ContentId, Record)> = records(catalog)?
        .into_iter()
        .map(|(id, record)| {
            let record = registry.attach(&id, record);
            (id, record)
        })
        .collect();
    let by_id: HashMap<&ContentId, &Record> = movies.iter().map(|(id, r)| (id, r)).collect();

    for group in kolekto_tree::find_duplicates(movies.iter().cloned()) {
        let ids = group
            .ids
            .iter()
            .map(|id| {
                let record = by_id.get(id);
                let field = |key: &str| {
                    record
                        .and_then(|r| r.get(key))
                        .map(|v| v.join(", "))
                        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
                };
                format!("{} ({}/{})", style(format!(" {} ", id)).reverse(), field("quality"), field("ext"))
            })
            .collect::<Vec<_>>()
            .join(" ");
        let year = group.year.map(|y| y.to_string()).unwrap_or_else(|| "unknown".to_string());
        println!("{} ({}): {}", style(&group.title).bold(), year, ids);
    }
    Ok(())
}
