//! Application registry: the identifiers of the games that can be played.
//!
//! The registry is read once per batch and never written.

use std::fs;
use std::path::PathBuf;

/// Errors that can occur while reading a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read registry: {0}")]
    Read(#[from] std::io::Error),

    #[error("Registry is empty")]
    Empty,
}

/// A read-only source of known application identifiers.
pub trait AppRegistry: Send + Sync {
    /// All known identifiers.
    fn known_app_ids(&self) -> Result<Vec<String>, RegistryError>;
}

/// A registry held in memory, typically built from config or CLI flags.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    ids: Vec<String>,
}

impl StaticRegistry {
    pub fn new(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl AppRegistry for StaticRegistry {
    fn known_app_ids(&self) -> Result<Vec<String>, RegistryError> {
        if self.ids.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(self.ids.clone())
    }
}

/// A registry file with one identifier per line.
///
/// Blank lines and lines starting with `#` are ignored.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AppRegistry for FileRegistry {
    fn known_app_ids(&self) -> Result<Vec<String>, RegistryError> {
        if !self.path.exists() {
            return Err(RegistryError::NotFound {
                path: self.path.clone(),
            });
        }

        let content = fs::read_to_string(&self.path)?;
        let ids = parse_registry(&content);
        if ids.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(ids)
    }
}

/// Combines several registries; identifiers from all of them are known.
pub struct ChainedRegistry {
    sources: Vec<Box<dyn AppRegistry>>,
}

impl ChainedRegistry {
    pub fn new(sources: Vec<Box<dyn AppRegistry>>) -> Self {
        Self { sources }
    }
}

impl AppRegistry for ChainedRegistry {
    fn known_app_ids(&self) -> Result<Vec<String>, RegistryError> {
        let mut ids = Vec::new();
        for source in &self.sources {
            match source.known_app_ids() {
                Ok(found) => ids.extend(found),
                Err(RegistryError::Empty) => continue,
                Err(e) => return Err(e),
            }
        }
        if ids.is_empty() {
            return Err(RegistryError::Empty);
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

fn parse_registry(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
