//! Snapshot comparison
//!
//! Two snapshots of the same host are compared file by file using SHA-256
//! digests of their contents.

use crate::storage::traits::{StorageError, StorageResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Result of comparing two snapshots
///
/// Every list holds paths relative to the snapshot directory, `/`-separated
/// and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    pub from: String,
    pub to: String,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
}

impl SnapshotDiff {
    /// Returns true if both snapshots hold identical files
    pub fn is_identical(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Compares two snapshot directories
pub fn diff_dirs(from_dir: &Path, to_dir: &Path) -> StorageResult<SnapshotDiff> {
    let before = digest_tree(from_dir)?;
    let after = digest_tree(to_dir)?;

    let mut diff = SnapshotDiff::default();

    for (path, digest) in &before {
        match after.get(path) {
            None => diff.removed.push(path.clone()),
            Some(other) if other != digest => diff.changed.push(path.clone()),
            Some(_) => diff.unchanged.push(path.clone()),
        }
    }

    diff.added = after
        .keys()
        .filter(|path| !before.contains_key(*path))
        .cloned()
        .collect();

    Ok(diff)
}

/// Maps every file under `root` to the hex SHA-256 of its contents
pub fn digest_tree(root: &Path) -> StorageResult<BTreeMap<String, String>> {
    let mut digests = BTreeMap::new();
    collect_digests(root, root, &mut digests)?;
    Ok(digests)
}

fn collect_digests(
    root: &Path,
    dir: &Path,
    digests: &mut BTreeMap<String, String>,
) -> StorageResult<()> {
    let entries = fs::read_dir(dir).map_err(StorageError::io(dir))?;

    for entry in entries {
        let entry = entry.map_err(StorageError::io(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(StorageError::io(&path))?;

        if file_type.is_dir() {
            collect_digests(root, &path, digests)?;
        } else if file_type.is_file() {
            let bytes = fs::read(&path).map_err(StorageError::io(&path))?;
            let digest = hex::encode(Sha256::digest(&bytes));

            let rel = path
                .strip_prefix(root)
                .map_err(|_| StorageError::PathEscape(path.display().to_string()))?;
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            digests.insert(key, digest);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_diff_classifies_files() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();

        write(a.path(), "index.html", "home");
        write(a.path(), "_/about.html", "about v1");
        write(a.path(), "_/old.html", "gone");

        write(b.path(), "index.html", "home");
        write(b.path(), "_/about.html", "about v2");
        write(b.path(), "_/img/new.png", "png");

        let diff = diff_dirs(a.path(), b.path()).unwrap();
        assert_eq!(diff.added, vec!["_/img/new.png"]);
        assert_eq!(diff.removed, vec!["_/old.html"]);
        assert_eq!(diff.changed, vec!["_/about.html"]);
        assert_eq!(diff.unchanged, vec!["index.html"]);
        assert!(!diff.is_identical());
    }

    #[test]
    fn test_identical_snapshots() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write(a.path(), "_/index.html", "same");
        write(b.path(), "_/index.html", "same");

        assert!(diff_dirs(a.path(), b.path()).unwrap().is_identical());
    }

    #[test]
    fn test_digest_tree_uses_forward_slashes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "_/a/b/c.css", "x");

        let digests = digest_tree(dir.path()).unwrap();
        assert!(digests.contains_key("_/a/b/c.css"));
        assert_eq!(digests["_/a/b/c.css"].len(), 64);
    }
}
