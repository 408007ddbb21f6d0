//! Site-Indexer: crawl orchestration for a small site search engine
//!
//! This crate crawls a configured set of web sites, stores every fetched page,
//! and tracks a per-site indexing status that callers can start, stop and
//! observe while a run is in progress.

pub mod api;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

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

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Errors returned synchronously by the start/stop boundary
///
/// These are control outcomes rather than crawl failures and are surfaced to
/// the caller verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("indexing already running")]
    AlreadyRunning,

    #[error("indexing is not running")]
    NotRunning,
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::Orchestrator;
pub use state::SiteStatus;
pub use url::{normalize_url, SiteRoot};
