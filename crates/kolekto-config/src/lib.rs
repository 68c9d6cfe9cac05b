//! # kolekto-config
//!
//! Configuration management for Kolekto.
//!
//! Loads configuration from:
//! 1. Built-in defaults
//! 2. `~/.config/kolekto/config.toml` (global)
//! 3. `<tree>/.kolekto/config.toml` (catalog-local, overrides global)
//! 4. Environment variables (highest priority)
//!
//! Layers are merged table by table; arrays (`[[view]]`, `[[datasource]]`)
//! are replaced as a whole by the layer that sets them.

pub mod logging;
pub mod path;
pub mod profile;
pub mod testing;

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

use kolekto_cas::HashAlgorithm;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use logging::{init_logging, LogLevel};
pub use path::{find_root, CatalogPaths};
pub use profile::{profile_for, MoviesProfile, Profile, SeriesProfile};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Collection profile: `movies` or `series`
    pub profile: String,
    pub store: StoreConfig,
    #[serde(rename = "view")]
    pub views: Vec<ViewConfig>,
    #[serde(rename = "datasource")]
    pub datasources: Vec<DatasourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: "movies".to_string(),
            store: StoreConfig::default(),
            views: vec![ViewConfig {
                name: "Titles".to_string(),
                root: None,
                patterns: vec!["{title}.{ext}".to_string()],
            }],
            datasources: vec![DatasourceConfig {
                name: "filename".to_string(),
                options: BTreeMap::new(),
            }],
        }
    }
}

impl Config {
    /// Load the effective config of the catalog rooted at `tree`.
    pub fn load(tree: &Path) -> Result<Self, ConfigError> {
        let global = path::global_config_path();
        let local = CatalogPaths::new(tree).config_path();
        let mut config = Self::load_layers(global.as_deref(), &local)?;

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Merge defaults, then the global file, then the catalog file.
    /// Missing files are skipped.
    pub fn load_layers(global: Option<&Path>, local: &Path) -> Result<Self, ConfigError> {
        let mut merged = toml::Value::try_from(Config::default())?;

        for layer in global.into_iter().chain(std::iter::once(local)) {
            if layer.exists() {
                debug!("Loading config from {:?}", layer);
                let contents = std::fs::read_to_string(layer)?;
                let value: toml::Value = toml::from_str(&contents)?;
                merge(&mut merged, value);
            }
        }

        Ok(merged.try_into()?)
    }

    /// Apply environment variable overrides (`KOLEKTO_PROFILE`, `KOLEKTO_HASH`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(profile) = lookup("KOLEKTO_PROFILE") {
            self.profile = profile;
        }
        if let Some(hash) = lookup("KOLEKTO_HASH") {
            self.store.hash = hash
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("KOLEKTO_HASH: {}", e)))?;
        }
        Ok(())
    }

    /// Check settings that the schema alone can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if profile_for(&self.profile).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown profile {:?} (expected one of {})",
                self.profile,
                profile::PROFILE_NAMES.join(", ")
            )));
        }

        let mut names = HashSet::new();
        let mut roots: Vec<PathBuf> = Vec::new();
        for view in &self.views {
            if view.name.trim().is_empty() {
                return Err(ConfigError::Invalid("view with an empty name".into()));
            }
            if !names.insert(view.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate view {:?}", view.name)));
            }
            if view.patterns.is_empty() {
                return Err(ConfigError::Invalid(format!("view {:?} has no pattern", view.name)));
            }
            if view.patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("view {:?} has an empty pattern", view.name)));
            }
            let root = view.root_dir();
            if !is_plain_relative(&root) {
                return Err(ConfigError::Invalid(format!(
                    "view {:?}: root {:?} must be a relative path inside the tree",
                    view.name, root
                )));
            }
            if root.starts_with(path::CATALOG_DIR) {
                return Err(ConfigError::Invalid(format!(
                    "view {:?}: root may not be inside {}",
                    view.name,
                    path::CATALOG_DIR
                )));
            }
            if roots.iter().any(|other: &PathBuf| other.starts_with(&root) || root.starts_with(other)) {
                return Err(ConfigError::Invalid(format!(
                    "view {:?} overlaps the root of another view",
                    view.name
                )));
            }
            roots.push(root);
        }

        let mut sources = HashSet::new();
        for ds in &self.datasources {
            if !sources.insert(ds.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate datasource {:?}", ds.name)));
            }
        }
        Ok(())
    }

    /// The selected collection profile.
    pub fn profile(&self) -> &'static dyn Profile {
        profile_for(&self.profile).unwrap_or(&MoviesProfile)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Generate default config TOML string
    pub fn default_toml() -> Result<String, ConfigError> {
        Config::default().to_toml()
    }
}

/// Recursive table merge; anything that isn't a table on both sides is
/// replaced by `overlay`.
fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn is_plain_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// Store configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Digest naming store entries
    pub hash: HashAlgorithm,
}

/// One view: a directory of links generated from patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub name: String,
    /// Directory relative to the tree root; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    pub patterns: Vec<String>,
}

impl ViewConfig {
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from(&self.name))
    }
}

/// A metadata provider entry. Unknown keys are kept as provider options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasourceConfig {
    pub name: String,
    #[serde(flatten)]
    pub options: BTreeMap<String, toml::Value>,
}
