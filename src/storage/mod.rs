//! Storage module for persisting snapshots
//!
//! This module handles all on-disk state of the archive, including:
//! - Reserving per-host, per-timestamp snapshot directories
//! - Writing fetched resources at their normalized paths
//! - The capture manifest
//! - Read-only access to stored files and snapshot comparison

mod diff;
mod filesystem;
mod manifest;
mod traits;

pub use diff::{diff_dirs, digest_tree, SnapshotDiff};
pub use filesystem::{FsStorage, MANIFEST_FILE, SNAPSHOTS_DIR};
pub use manifest::{Manifest, ManifestFile};
pub use traits::{SnapshotHandle, Storage, StorageError, StorageResult};

use chrono::{Duration, NaiveDateTime, Utc};

/// Capture timestamp layout, e.g. `20240131235959`
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Returns the current UTC time as a capture timestamp
pub fn timestamp_now() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Returns true if `s` is exactly 14 ASCII digits
///
/// # Examples
///
/// ```
/// use wayback_lite::storage::is_timestamp;
///
/// assert!(is_timestamp("20240101000000"));
/// assert!(!is_timestamp("2024-01-01"));
/// assert!(!is_timestamp("202401010000001"));
/// ```
pub fn is_timestamp(s: &str) -> bool {
    s.len() == 14 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Returns the timestamp one second after `timestamp`
pub fn next_timestamp(timestamp: &str) -> StorageResult<String> {
    let parsed = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .map_err(|_| StorageError::InvalidTimestamp(timestamp.to_string()))?;
    Ok((parsed + Duration::seconds(1)).format(TIMESTAMP_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_now_format() {
        assert!(is_timestamp(&timestamp_now()));
    }

    #[test]
    fn test_next_timestamp_rolls_over() {
        assert_eq!(next_timestamp("20240101000000").unwrap(), "20240101000001");
        assert_eq!(next_timestamp("20231231235959").unwrap(), "20240101000000");
    }

    #[test]
    fn test_next_timestamp_invalid() {
        assert!(next_timestamp("20241399000000").is_err());
        assert!(next_timestamp("garbage").is_err());
    }
}
