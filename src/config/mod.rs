//! Configuration module for Wayback-Lite
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so running without a file is equivalent to an empty one.
//!
//! # Example
//!
//! ```no_run
//! use wayback_lite::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("wayback.toml")).unwrap();
//! println!("Snapshots are stored in: {}", config.output.data_dir);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, UserAgentConfig, MAX_PAGE_BUDGET, MIN_PAGE_BUDGET,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
