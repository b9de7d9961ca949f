//! Configuration module for Fiction-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A missing default config file is not an error: the built-in defaults are used.
//!
//! # Example
//!
//! ```no_run
//! use fiction_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawl stops after {} fictions", config.crawler.max_novels);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_or_default, load_config_with_hash,
    parse_config,
};
