//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the indexer, including:
//! - SQLite database initialization and schema management
//! - Site rows and their status transitions
//! - Page rows produced by the crawler

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{PageStore, SiteStore, Storage, StorageError, StorageResult};

use crate::state::SiteStatus;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a site in the database
#[derive(Debug, Clone, PartialEq)]
pub struct SiteRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// A site row about to be inserted
#[derive(Debug, Clone)]
pub struct NewSite {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: DateTime<Utc>,
}

impl NewSite {
    /// A site entering the INDEXING state now
    pub fn indexing(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            status: SiteStatus::Indexing,
            status_time: Utc::now(),
        }
    }
}

/// Represents a fetched page in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub code: u16,
    pub content: String,
}

/// A page row about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPage {
    pub site_id: i64,
    pub path: String,
    pub code: u16,
    pub content: String,
}
