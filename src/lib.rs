//! Matchweek: a polite weekly results collector
//!
//! This crate fetches a fixtures listing page under a rate-limit policy, finds the
//! most recently completed matchweek, hands every match report link to an external
//! scorer, and merges the scorer outputs into one weekly CSV file.

pub mod config;
pub mod fetch;
pub mod run;
pub mod schedule;

use thiserror::Error;

/// Main error type for Matchweek operations
#[derive(Debug, Error)]
pub enum MatchweekError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] fetch::CacheError),

    #[error("Transport error: {0}")]
    Transport(#[from] fetch::TransportError),

    #[error("Scorer failed: {0}")]
    Collaborator(#[from] run::CollaboratorError),

    #[error("Merge error: {0}")]
    Merge(#[from] run::MergeError),

    #[error("Invalid run state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: run::RunState,
        to: run::RunState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Matchweek operations
pub type Result<T> = std::result::Result<T, MatchweekError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{FetchEngine, FetchOutcome, ResourceRequest};
pub use run::{RunCoordinator, RunReport, RunState};
pub use schedule::{latest_completed_period, links_for_period, ScheduleLayout};
