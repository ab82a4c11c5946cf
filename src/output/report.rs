//! Plain-text reports for the command line
//!
//! Every report is built as a string by a `format_*` function and printed
//! by the matching `print_*` wrapper.

use crate::pipeline::CaptureOutcome;
use crate::progress::ProgressEvent;
use crate::storage::{Manifest, SnapshotDiff};

/// Formats the result of a capture
pub fn format_capture(outcome: &CaptureOutcome) -> String {
    let mut out = String::new();
    out.push_str("=== Capture Complete ===\n\n");
    out.push_str(&format!("  Host: {}\n", outcome.host));
    out.push_str(&format!("  Timestamp: {}\n", outcome.timestamp));
    out.push_str(&format!("  Base: {}\n", outcome.base_prefix));
    out.push_str(&format!("  Resources: {}\n", outcome.resource_count));
    if let Some(strategy) = outcome.strategy {
        out.push_str(&format!("  Strategy: {}\n", strategy));
    }
    out
}

/// Formats one progress event as a single line
pub fn format_progress(event: &ProgressEvent) -> String {
    format!(
        "[{}] {}/{} {}",
        event.phase, event.page_count, event.total, event.url
    )
}

/// Formats the snapshot timestamps of one host
pub fn format_snapshot_list(host: &str, timestamps: &[String]) -> String {
    let mut out = format!("Snapshots of {} ({}):\n", host, timestamps.len());
    for timestamp in timestamps {
        out.push_str(&format!("  {}  /snapshots/{}/{}/\n", timestamp, host, timestamp));
    }
    out
}

/// Formats the whole manifest, hosts in alphabetical order
pub fn format_manifest(manifest: &Manifest) -> String {
    if manifest.is_empty() {
        return "Manifest is empty\n".to_string();
    }

    let mut out = String::new();
    for (host, timestamps) in manifest {
        out.push_str(&format!("{} ({}):\n", host, timestamps.len()));
        for timestamp in timestamps {
            out.push_str(&format!("  {}\n", timestamp));
        }
    }
    out
}

/// Formats a snapshot comparison
pub fn format_diff(host: &str, diff: &SnapshotDiff) -> String {
    let mut out = format!("=== {} {} -> {} ===\n\n", host, diff.from, diff.to);

    for (marker, paths) in [("+", &diff.added), ("-", &diff.removed), ("~", &diff.changed)] {
        for path in paths {
            out.push_str(&format!("{} {}\n", marker, path));
        }
    }

    out.push_str(&format!(
        "\n{} added, {} removed, {} changed, {} unchanged\n",
        diff.added.len(),
        diff.removed.len(),
        diff.changed.len(),
        diff.unchanged.len()
    ));
    out
}

pub fn print_capture(outcome: &CaptureOutcome) {
    print!("{}", format_capture(outcome));
}

pub fn print_snapshot_list(host: &str, timestamps: &[String]) {
    print!("{}", format_snapshot_list(host, timestamps));
}

pub fn print_manifest(manifest: &Manifest) {
    print!("{}", format_manifest(manifest));
}

pub fn print_diff(host: &str, diff: &SnapshotDiff) {
    print!("{}", format_diff(host, diff));
}
