//! Output module for presenting captures and snapshots
//!
//! This module handles:
//! - Capture results and live progress lines
//! - Snapshot listings and the manifest
//! - Snapshot comparisons, as text or as a markdown report

mod markdown;
mod report;

pub use markdown::{format_markdown_diff, write_markdown_diff};
pub use report::{
    format_capture, format_diff, format_manifest, format_progress, format_snapshot_list,
    print_capture, print_diff, print_manifest, print_snapshot_list,
};
