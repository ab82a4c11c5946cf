//! State module for tracking capture progress
//!
//! This module provides the state machine a capture moves through.
//!
//! # Components
//!
//! - `PipelineState`: The stage of a capture (reserving, crawling, saving, finalizing, recorded, failed)

mod pipeline_state;

// Re-export main types
pub use pipeline_state::PipelineState;
