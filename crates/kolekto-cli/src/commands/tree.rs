use std::path::Path;

use anyhow::{Context, Result};
use kolekto_tree::Catalog;

pub fn init(tree: Option<&Path>) -> Result<()> {
    let root = match tree {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let catalog = Catalog::init(&root).context("Failed to initialize kolekto tree")?;
    println!("Initialized empty Kolekto tree in {}.", catalog.root().display());
    Ok(())
}

/// Print the configuration in effect, all layers applied.
pub fn config(catalog: &Catalog) -> Result<()> {
    print!("{}", catalog.config().to_toml()?);
    Ok(())
}
