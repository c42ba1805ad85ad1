//! Configuration module for Matchweek
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use matchweek::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("matchweek.toml")).unwrap();
//! println!("Fetching {} with {} attempts", config.source.url, config.fetch.max_attempts);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheBackend, CacheConfig, Config, FailurePolicy, FetchConfig, IdentityProfile, OutputConfig,
    ScheduleConfig, ScorerConfig, ScrapeApiConfig, SourceConfig, ThrottleConfig, TransportKind,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
