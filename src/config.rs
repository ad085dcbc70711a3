//! User configuration stored as TOML in the platform config directory.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use toml_edit::{DocumentMut, Item};

use crate::registry::{AppRegistry, ChainedRegistry, FileRegistry, StaticRegistry};
use crate::session::appid::DEFAULT_INVITE_PREFIX;
use crate::session::{FailurePolicy, ReconstructOptions};
use crate::store::DEFAULT_BATCH_SIZE;

const APP_DIR: &str = "msgsift";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub reconstruct: ReconstructConfig,
    pub store: StoreConfig,
}

/// Where known application identifiers come from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// File with one identifier per line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Identifiers listed inline
    pub app_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructConfig {
    pub failure_policy: FailurePolicy,
    pub parallel: bool,
    pub invite_prefix: String,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Abort,
            parallel: true,
            invite_prefix: DEFAULT_INVITE_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bodies_path: Option<PathBuf>,
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sessions_path: None,
            bodies_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Path of the config file: `<config_dir>/msgsift/config.toml`.
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load the config file, or defaults when it does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    /// Build the application registry described by the `[registry]` section.
    pub fn registry(&self) -> Box<dyn AppRegistry> {
        let mut sources: Vec<Box<dyn AppRegistry>> = Vec::new();
        if let Some(path) = &self.registry.path {
            sources.push(Box::new(FileRegistry::new(path)));
        }
        sources.push(Box::new(StaticRegistry::new(self.registry.app_ids.clone())));
        Box::new(ChainedRegistry::new(sources))
    }

    pub fn reconstruct_options(&self) -> ReconstructOptions {
        ReconstructOptions {
            policy: self.reconstruct.failure_policy,
            parallel: self.reconstruct.parallel,
            invite_prefix: self.reconstruct.invite_prefix.clone(),
        }
    }
}

/// Outcome of [`migrate_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct MigrateResult {
    /// The migrated file content
    pub content: String,
    /// Added fields as `section.key`
    pub added_fields: Vec<String>,
    /// Sections that did not exist at all
    pub sections_added: Vec<String>,
}

impl MigrateResult {
    pub fn has_changes(&self) -> bool {
        !self.added_fields.is_empty() || !self.sections_added.is_empty()
    }
}

/// Add the fields of the default config that `content` lacks.
///
/// Existing values, comments and ordering are left alone.
pub fn migrate_config(content: &str) -> Result<MigrateResult> {
    let mut doc: DocumentMut = content.parse().context("Failed to parse config as TOML")?;
    let defaults: DocumentMut = toml::to_string_pretty(&Config::default())?
        .parse()
        .context("Failed to parse default config")?;

    let mut added_fields = Vec::new();
    let mut sections_added = Vec::new();

    for (section, default_item) in defaults.iter() {
        let Some(default_table) = default_item.as_table() else {
            continue;
        };

        match doc.get_mut(section) {
            None => {
                for (key, _) in default_table.iter() {
                    added_fields.push(format!("{}.{}", section, key));
                }
                doc.insert(section, Item::Table(default_table.clone()));
                sections_added.push(section.to_string());
            }
            Some(existing) => {
                let Some(table) = existing.as_table_mut() else {
                    bail!("Config key '{}' must be a table", section);
                };
                for (key, value) in default_table.iter() {
                    if !table.contains_key(key) {
                        table.insert(key, value.clone());
                        added_fields.push(format!("{}.{}", section, key));
                    }
                }
            }
        }
    }

    Ok(MigrateResult {
        content: doc.to_string(),
        added_fields,
        sections_added,
    })
}
