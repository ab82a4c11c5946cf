//! Filesystem storage implementation
//!
//! This module provides a directory-tree implementation of the Storage trait:
//!
//! ```text
//! <data-dir>/
//!   manifest.json
//!   snapshots/<host>/<timestamp>/
//!     index.html              copy of the seed page
//!     _/...                   same-origin pages and assets
//!     _ext/<host>/...         assets from other origins
//! ```

use crate::storage::diff::diff_dirs;
use crate::storage::manifest::{Manifest, ManifestFile};
use crate::storage::traits::{SnapshotHandle, Storage, StorageError, StorageResult};
use crate::storage::{is_timestamp, next_timestamp, SnapshotDiff};
use crate::url::{extract_host, foreign_asset_path, is_safe_relative, normalize_path_for_disk, same_origin, INDEX_FILE};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use url::Url;

/// Directory under the data root holding every snapshot
pub const SNAPSHOTS_DIR: &str = "snapshots";

/// Manifest file name under the data root
pub const MANIFEST_FILE: &str = "manifest.json";

/// Filesystem storage backend
#[derive(Debug)]
pub struct FsStorage {
    root: PathBuf,
    manifest: ManifestFile,
    // Serializes manifest read-modify-write cycles within the process
    manifest_lock: Mutex<()>,
}

impl FsStorage {
    /// Creates a storage rooted at `root`, creating the directory tree if needed
    ///
    /// # Arguments
    ///
    /// * `root` - The data directory
    ///
    /// # Returns
    ///
    /// * `Ok(FsStorage)` - Storage ready for use
    /// * `Err(StorageError)` - The data directory could not be created
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        let snapshots = root.join(SNAPSHOTS_DIR);
        fs::create_dir_all(&snapshots).map_err(StorageError::io(&snapshots))?;

        Ok(Self {
            manifest: ManifestFile::new(root.join(MANIFEST_FILE)),
            root,
            manifest_lock: Mutex::new(()),
        })
    }

    /// Directory holding every snapshot of `host`
    pub fn host_dir(&self, host: &str) -> StorageResult<PathBuf> {
        if !is_safe_relative(Path::new(host)) || host.contains(['/', '\\']) {
            return Err(StorageError::PathEscape(host.to_string()));
        }
        Ok(self.root.join(SNAPSHOTS_DIR).join(host))
    }

    /// Directory of one snapshot
    pub fn snapshot_dir(&self, host: &str, timestamp: &str) -> StorageResult<PathBuf> {
        if !is_timestamp(timestamp) {
            return Err(StorageError::InvalidTimestamp(timestamp.to_string()));
        }
        Ok(self.host_dir(host)?.join(timestamp))
    }

    /// Directory of an existing snapshot
    fn existing_snapshot_dir(&self, host: &str, timestamp: &str) -> StorageResult<PathBuf> {
        let dir = self.snapshot_dir(host, timestamp)?;
        if !dir.is_dir() {
            return Err(StorageError::NotFound(format!("snapshot {}/{}", host, timestamp)));
        }
        Ok(dir)
    }

    fn handle(&self, url: &Url, host: String, timestamp: String, dir: PathBuf) -> SnapshotHandle {
        let mut handle = SnapshotHandle {
            dir,
            host,
            timestamp,
            origin: url.clone(),
        };
        handle.rebase(url);
        handle
    }

    /// Relative path a resource is stored at within `handle`
    fn relative_path(handle: &SnapshotHandle, url: &Url) -> String {
        if same_origin(url, &handle.origin) {
            normalize_path_for_disk(url)
        } else {
            foreign_asset_path(url)
        }
    }
}

fn host_of(url: &Url) -> StorageResult<String> {
    extract_host(url).ok_or_else(|| StorageError::NotFound(format!("host in {}", url)))
}

/// Clears whatever stands in the way of writing a file at `target`
///
/// A file where a directory is needed (`/docs` stored before `/docs/intro`)
/// is removed, as is a directory where the file itself goes.
fn reconcile_conflicts(base: &Path, rel: &Path) -> StorageResult<()> {
    let mut current = base.to_path_buf();
    let mut components = rel.components().peekable();

    while let Some(component) = components.next() {
        current.push(component);
        let is_last = components.peek().is_none();

        let Ok(metadata) = fs::symlink_metadata(&current) else {
            continue;
        };

        if is_last {
            if metadata.is_dir() {
                tracing::debug!("Replacing directory {} with a file", current.display());
                fs::remove_dir_all(&current).map_err(StorageError::io(&current))?;
            }
        } else if !metadata.is_dir() {
            tracing::debug!("Replacing file {} with a directory", current.display());
            fs::remove_file(&current).map_err(StorageError::io(&current))?;
        }
    }

    Ok(())
}

impl Storage for FsStorage {
    // ===== Capture =====

    fn reserve(&self, url: &Url, timestamp: &str) -> StorageResult<SnapshotHandle> {
        let host = host_of(url)?;
        let dir = self.snapshot_dir(&host, timestamp)?;
        fs::create_dir_all(&dir).map_err(StorageError::io(&dir))?;

        Ok(self.handle(url, host, timestamp.to_string(), dir))
    }

    fn reserve_unique(&self, url: &Url, timestamp: &str) -> StorageResult<SnapshotHandle> {
        let host = host_of(url)?;
        let host_dir = self.host_dir(&host)?;
        fs::create_dir_all(&host_dir).map_err(StorageError::io(&host_dir))?;

        let mut timestamp = timestamp.to_string();
        loop {
            let dir = self.snapshot_dir(&host, &timestamp)?;
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(self.handle(url, host, timestamp, dir)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!("Snapshot {}/{} exists, trying next second", host, timestamp);
                    timestamp = next_timestamp(&timestamp)?;
                }
                Err(e) => return Err(StorageError::io(&dir)(e)),
            }
        }
    }

    fn write(&self, handle: &SnapshotHandle, url: &Url, bytes: &[u8]) -> StorageResult<String> {
        let rel = Self::relative_path(handle, url);
        let rel_path = Path::new(&rel);

        if !is_safe_relative(rel_path) {
            return Err(StorageError::PathEscape(rel));
        }

        reconcile_conflicts(&handle.dir, rel_path)?;

        let target = handle.dir.join(rel_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(StorageError::io(parent))?;
        }
        fs::write(&target, bytes).map_err(StorageError::io(&target))?;

        tracing::debug!("Saved {} -> {}", url, rel);
        Ok(rel)
    }

    fn finalize(&self, handle: &SnapshotHandle, seed_url: &Url) -> StorageResult<()> {
        let source = handle.dir.join(Self::relative_path(handle, seed_url));
        if !source.is_file() {
            return Err(StorageError::NotFound(format!("seed page {}", seed_url)));
        }

        let landing = handle.dir.join(INDEX_FILE);
        fs::copy(&source, &landing).map_err(StorageError::io(&landing))?;
        Ok(())
    }

    fn record(&self, url: &Url, timestamp: &str) -> StorageResult<()> {
        if !is_timestamp(timestamp) {
            return Err(StorageError::InvalidTimestamp(timestamp.to_string()));
        }
        let host = host_of(url)?;

        let _guard = self.manifest_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.manifest.record(&host, timestamp)? {
            tracing::info!("Recorded capture {}/{}", host, timestamp);
        }
        Ok(())
    }

    // ===== Queries =====

    fn list_by_host(&self, url: &Url) -> StorageResult<Vec<String>> {
        let host_dir = self.host_dir(&host_of(url)?)?;

        let entries = match fs::read_dir(&host_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&host_dir)(e)),
        };

        let mut timestamps = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StorageError::io(&host_dir))?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if let Some(name) = entry.file_name().to_str() {
                if is_dir && is_timestamp(name) {
                    timestamps.push(name.to_string());
                }
            }
        }

        timestamps.sort();
        Ok(timestamps)
    }

    fn manifest(&self) -> StorageResult<Manifest> {
        let _guard = self.manifest_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.manifest.load()
    }

    fn read_raw(&self, host: &str, timestamp: &str, rel_path: &str) -> StorageResult<Vec<u8>> {
        let dir = self.existing_snapshot_dir(host, timestamp)?;

        let rel = Path::new(rel_path.trim_start_matches('/'));
        if !is_safe_relative(rel) {
            return Err(StorageError::PathEscape(rel_path.to_string()));
        }

        let path = dir.join(rel);
        if !path.is_file() {
            return Err(StorageError::NotFound(format!("{}/{}/{}", host, timestamp, rel_path)));
        }

        fs::read(&path).map_err(StorageError::io(&path))
    }

    fn diff(&self, host: &str, from: &str, to: &str) -> StorageResult<SnapshotDiff> {
        let from_dir = self.existing_snapshot_dir(host, from)?;
        let to_dir = self.existing_snapshot_dir(host, to)?;

        let mut diff = diff_dirs(&from_dir, &to_dir)?;
        diff.from = from.to_string();
        diff.to = to.to_string();
        Ok(diff)
    }
}
