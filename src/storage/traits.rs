//! Storage traits and error types
//!
//! This module defines the trait interface for snapshot storage backends and
//! associated error types.

use crate::storage::{Manifest, SnapshotDiff};
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path escapes snapshot directory: {0}")]
    PathEscape(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid snapshot timestamp: {0}")]
    InvalidTimestamp(String),
}

impl StorageError {
    /// Returns a closure wrapping an I/O error with the path it happened at
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A reserved snapshot directory, valid for one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    /// Absolute directory the snapshot is written to
    pub dir: PathBuf,

    /// Host (with non-default port) the snapshot belongs to
    pub host: String,

    /// 14-digit capture timestamp
    pub timestamp: String,

    /// Origin of the seed URL; other origins are stored as foreign assets
    pub origin: Url,
}

impl SnapshotHandle {
    /// URL path prefix under which this snapshot is served
    ///
    /// # Example
    ///
    /// ```
    /// # use std::path::PathBuf;
    /// # use url::Url;
    /// # use wayback_lite::storage::SnapshotHandle;
    /// let handle = SnapshotHandle {
    ///     dir: PathBuf::from("/data/snapshots/example.com/20240101000000"),
    ///     host: "example.com".to_string(),
    ///     timestamp: "20240101000000".to_string(),
    ///     origin: Url::parse("https://example.com/").unwrap(),
    /// };
    /// assert_eq!(handle.base_prefix(), "/snapshots/example.com/20240101000000/");
    /// ```
    pub fn base_prefix(&self) -> String {
        format!("/snapshots/{}/{}/", self.host, self.timestamp)
    }

    /// Makes `url`'s origin the one stored as the site itself
    ///
    /// Used when the seed redirects to another origin; the snapshot keeps
    /// its host and timestamp.
    pub fn rebase(&mut self, url: &Url) {
        let mut origin = url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        self.origin = origin;
    }
}

/// Storage trait for snapshot backends
///
/// This trait defines every persistence operation the capture pipeline and
/// the read-only views need.
pub trait Storage: Send + Sync {
    // ===== Capture =====

    /// Creates the directory for a new snapshot
    ///
    /// Reserving an existing timestamp reuses its directory.
    fn reserve(&self, url: &Url, timestamp: &str) -> StorageResult<SnapshotHandle>;

    /// Creates the directory for a new snapshot, moving the timestamp forward
    /// one second at a time until it names a directory that did not exist
    fn reserve_unique(&self, url: &Url, timestamp: &str) -> StorageResult<SnapshotHandle>;

    /// Writes one resource into a snapshot
    ///
    /// # Returns
    ///
    /// The path the resource was written to, relative to the snapshot directory
    fn write(&self, handle: &SnapshotHandle, url: &Url, bytes: &[u8]) -> StorageResult<String>;

    /// Copies the seed page's file to the snapshot's landing `index.html`
    fn finalize(&self, handle: &SnapshotHandle, seed_url: &Url) -> StorageResult<()>;

    /// Appends a capture to the manifest (idempotent)
    fn record(&self, url: &Url, timestamp: &str) -> StorageResult<()>;

    // ===== Queries =====

    /// Lists the timestamps of every snapshot of the URL's host, oldest first
    fn list_by_host(&self, url: &Url) -> StorageResult<Vec<String>>;

    /// Returns the full host → timestamps manifest
    fn manifest(&self) -> StorageResult<Manifest>;

    /// Reads a stored file verbatim
    fn read_raw(&self, host: &str, timestamp: &str, rel_path: &str) -> StorageResult<Vec<u8>>;

    /// Compares the file trees of two snapshots of one host
    fn diff(&self, host: &str, from: &str, to: &str) -> StorageResult<SnapshotDiff>;
}
