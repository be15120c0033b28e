use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::paths;

pub const GEMINI_KEY_NAME: &str = "gemini-api-key";
pub const TOGETHER_KEY_NAME: &str = "together-api-key";

/// Flat string storage for the service keys. No versioning, no expiry.
pub trait KeyStorage {
    fn get(&self, name: &str) -> Result<Option<String>>;
    fn set(&mut self, name: &str, value: &str) -> Result<()>;
}

/// Keys stored as a JSON object in `~/.tubeme/keys.json`.
#[derive(Debug, Clone)]
pub struct FileKeyStorage {
    path: PathBuf,
}

impl FileKeyStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Self {
        Self::new(paths::keys_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read keys: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse keys: {}", self.path.display()))
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create keys directory: {}", dir.display()))?;
        let mut file = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| "failed to create temporary keys file")?;
        let json = serde_json::to_string_pretty(values)?;
        file.write_all(json.as_bytes())
            .with_context(|| "failed to write temporary keys file")?;
        file.persist(&self.path)
            .with_context(|| format!("failed to write keys: {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyStorage for FileKeyStorage {
    fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.get(name).cloned())
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let mut values = self.read_all()?;
        values.insert(name.to_string(), value.to_string());
        self.write_all(&values)?;
        debug!("stored {} in {}", name, self.path.display());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryKeyStorage {
    values: HashMap<String, String>,
}

impl MemoryKeyStorage {
    pub fn with_value(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }
}

impl KeyStorage for MemoryKeyStorage {
    fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.values.get(name).cloned())
    }

    fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }
}
