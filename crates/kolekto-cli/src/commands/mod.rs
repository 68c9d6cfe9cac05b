//! Subcommand implementations and the helpers they share.

pub mod dump;
pub mod gc;
pub mod import;
pub mod link;
pub mod list;
pub mod movie;
pub mod tree;

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use kolekto_index::{Record, Scalar, Value};
use kolekto_tree::{Catalog, Pattern};

use crate::datasource::DatasourceRegistry;

/// Open the tree named by `--tree`, or the one enclosing the working
/// directory.
pub fn open(tree: Option<&Path>) -> Result<Catalog> {
    match tree {
        Some(root) => {
            Catalog::open(root).with_context(|| format!("Failed to open kolekto tree {}", root.display()))
        }
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            Catalog::discover(&cwd).context("Failed to open kolekto tree")
        }
    }
}

pub fn registry(catalog: &Catalog) -> Result<DatasourceRegistry> {
    DatasourceRegistry::from_config(&catalog.config().datasources).context("Invalid datasource configuration")
}

/// One-line rendering of a record with the profile's display pattern.
pub fn summary(catalog: &Catalog, record: &Record) -> Result<String> {
    let pattern = Pattern::parse(catalog.profile().default_pattern())?;
    Ok(pattern.render_joined(record, ", "))
}

/// Compare two records attribute by attribute; a missing attribute sorts
/// first.
pub fn compare_records(a: &Record, b: &Record, keys: &[&str]) -> Ordering {
    keys.iter()
        .map(|key| compare_values(a.get(key), b.get(key)))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let (a, b) = (a.as_slice(), b.as_slice());
            a.iter()
                .zip(b)
                .map(|(x, y)| compare_scalars(x, y))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len()))
        }
    }
}

fn compare_scalars(a: &Scalar, b: &Scalar) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}
