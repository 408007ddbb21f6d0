//! Storage traits and error types
//!
//! The site and page stores are separate capabilities; `Storage` is the
//! combination the indexer is wired with.

use crate::state::SiteStatus;
use crate::storage::{NewPage, NewSite, PageRecord, SiteRecord};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Site not found: {0}")]
    SiteNotFound(i64),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: SiteStatus, to: SiteStatus },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence of site rows
///
/// Implementations must be safe to share between the orchestrator's stop path
/// and every site run controller.
pub trait SiteStore: Send + Sync {
    /// Finds the site row for a normalized root URL
    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    /// Gets a site by ID
    fn find_site(&self, site_id: i64) -> StorageResult<Option<SiteRecord>>;

    /// Inserts a new site row
    fn save_site(&self, site: &NewSite) -> StorageResult<SiteRecord>;

    /// Deletes a site row; its pages must already be gone
    fn delete_site(&self, site_id: i64) -> StorageResult<()>;

    /// Deletes a site row and all of its pages in one transaction
    ///
    /// Pages inserted concurrently for the same site either land before the
    /// transaction and are removed with it, or fail their foreign key after.
    /// Returns the number of pages removed.
    fn delete_site_with_pages(&self, site_id: i64) -> StorageResult<u64>;

    /// Gets all sites currently in `status`
    fn find_sites_by_status(&self, status: SiteStatus) -> StorageResult<Vec<SiteRecord>>;

    /// Gets all sites ordered by ID
    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    /// Moves a site from `expected` to `status`, stamping the status time
    ///
    /// The update applies only if the row is still in `expected`, so a site
    /// that already reached a terminal status is never overwritten.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The row was updated
    /// * `Ok(false)` - The row was no longer in `expected` (or is gone)
    /// * `Err(StorageError::InvalidTransition)` - `expected -> status` is not a forward move
    fn update_site_status(
        &self,
        site_id: i64,
        expected: SiteStatus,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<bool>;
}

/// Persistence of page rows
pub trait PageStore: Send + Sync {
    /// Inserts a new page row
    fn save_page(&self, page: &NewPage) -> StorageResult<PageRecord>;

    /// Deletes every page of a site, returning how many were removed
    fn delete_pages_by_site(&self, site_id: i64) -> StorageResult<u64>;

    /// Gets all pages of a site ordered by ID
    fn find_pages_by_site(&self, site_id: i64) -> StorageResult<Vec<PageRecord>>;

    /// Counts the pages of a site
    fn count_pages_by_site(&self, site_id: i64) -> StorageResult<u64>;

    /// Counts the pages of a site grouped by status code
    fn count_pages_by_code(&self, site_id: i64) -> StorageResult<BTreeMap<u16, u64>>;
}

/// Combined storage capability
pub trait Storage: SiteStore + PageStore {}

impl<T: SiteStore + PageStore + ?Sized> Storage for T {}
