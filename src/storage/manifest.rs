//! Manifest persistence
//!
//! The manifest is a single JSON object mapping each host to the timestamps
//! captured for it, in recording order. It is rewritten through a temporary
//! file and a rename so readers never observe a partial document.

use crate::storage::traits::{StorageError, StorageResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Host → capture timestamps
pub type Manifest = BTreeMap<String, Vec<String>>;

/// The on-disk manifest file
#[derive(Debug, Clone)]
pub struct ManifestFile {
    path: PathBuf,
}

impl ManifestFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the manifest, creating an empty one if the file does not exist
    pub fn load(&self) -> StorageResult<Manifest> {
        if !self.path.exists() {
            let manifest = Manifest::new();
            self.save(&manifest)?;
            return Ok(manifest);
        }

        let content = fs::read_to_string(&self.path).map_err(StorageError::io(&self.path))?;
        if content.trim().is_empty() {
            return Ok(Manifest::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the manifest atomically
    pub fn save(&self, manifest: &Manifest) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(StorageError::io(parent))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(&tmp, json).map_err(StorageError::io(&tmp))?;
        fs::rename(&tmp, &self.path).map_err(StorageError::io(&self.path))?;
        Ok(())
    }

    /// Adds `timestamp` under `host` unless it is already there
    ///
    /// # Returns
    ///
    /// `true` if the manifest changed
    pub fn record(&self, host: &str, timestamp: &str) -> StorageResult<bool> {
        let mut manifest = self.load()?;
        let timestamps = manifest.entry(host.to_string()).or_default();

        if timestamps.iter().any(|t| t == timestamp) {
            return Ok(false);
        }

        timestamps.push(timestamp.to_string());
        self.save(&manifest)?;
        Ok(true)
    }
}
