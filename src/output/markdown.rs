//! Markdown diff reports
//!
//! This module renders the comparison of two snapshots as a markdown
//! document, listing added, removed and changed files.

use crate::storage::SnapshotDiff;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown diff report to a file
///
/// # Arguments
///
/// * `host` - The host both snapshots belong to
/// * `diff` - The comparison to render
/// * `output_path` - Path where the markdown file should be written
pub fn write_markdown_diff(host: &str, diff: &SnapshotDiff, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_diff(host, diff);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a snapshot comparison as markdown
pub fn format_markdown_diff(host: &str, diff: &SnapshotDiff) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Snapshot Diff: {}\n\n", host));
    md.push_str(&format!("- **From**: {}\n", diff.from));
    md.push_str(&format!("- **To**: {}\n\n", diff.to));

    md.push_str("## Summary\n\n");
    md.push_str("| Change | Files |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Added | {} |\n", diff.added.len()));
    md.push_str(&format!("| Removed | {} |\n", diff.removed.len()));
    md.push_str(&format!("| Changed | {} |\n", diff.changed.len()));
    md.push_str(&format!("| Unchanged | {} |\n\n", diff.unchanged.len()));

    if diff.is_identical() {
        md.push_str("The snapshots are identical.\n");
        return md;
    }

    for (title, paths) in [
        ("Added", &diff.added),
        ("Removed", &diff.removed),
        ("Changed", &diff.changed),
    ] {
        if paths.is_empty() {
            continue;
        }
        md.push_str(&format!("## {}\n\n", title));
        for path in paths {
            md.push_str(&format!("- `{}`\n", path));
        }
        md.push('\n');
    }

    md
}
