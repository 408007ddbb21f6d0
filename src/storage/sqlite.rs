//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the site and page stores.

use crate::state::SiteStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, SiteStore, StorageError, StorageResult};
use crate::storage::{NewPage, NewSite, PageRecord, SiteRecord};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

const SITE_COLUMNS: &str = "id, url, name, status, status_time, last_error";

/// SQLite storage backend
///
/// A single connection is shared behind a mutex; every operation is one short
/// statement so contention stays low even with many crawl tasks.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    let status: String = row.get(3)?;
    let status = SiteStatus::from_db_string(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown site status '{}'", status).into(),
        )
    })?;

    Ok(SiteRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        status,
        status_time: row.get(4)?,
        last_error: row.get(5)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        content: row.get(4)?,
    })
}

impl SiteStore for SqliteStorage {
    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let conn = self.conn();
        let site = conn
            .query_row(
                &format!(
                    "SELECT {} FROM site WHERE url = ?1 ORDER BY id DESC LIMIT 1",
                    SITE_COLUMNS
                ),
                params![url],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn find_site(&self, site_id: i64) -> StorageResult<Option<SiteRecord>> {
        let conn = self.conn();
        let site = conn
            .query_row(
                &format!("SELECT {} FROM site WHERE id = ?1", SITE_COLUMNS),
                params![site_id],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn save_site(&self, site: &NewSite) -> StorageResult<SiteRecord> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO site (status, status_time, url, name) VALUES (?1, ?2, ?3, ?4)",
            params![
                site.status.to_db_string(),
                site.status_time,
                site.url,
                site.name
            ],
        )?;

        Ok(SiteRecord {
            id: conn.last_insert_rowid(),
            url: site.url.clone(),
            name: site.name.clone(),
            status: site.status,
            status_time: site.status_time,
            last_error: None,
        })
    }

    fn delete_site(&self, site_id: i64) -> StorageResult<()> {
        let deleted = self
            .conn()
            .execute("DELETE FROM site WHERE id = ?1", params![site_id])?;
        if deleted == 0 {
            return Err(StorageError::SiteNotFound(site_id));
        }
        Ok(())
    }

    fn delete_site_with_pages(&self, site_id: i64) -> StorageResult<u64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let pages = tx.execute("DELETE FROM page WHERE site_id = ?1", params![site_id])?;
        let deleted = tx.execute("DELETE FROM site WHERE id = ?1", params![site_id])?;
        if deleted == 0 {
            return Err(StorageError::SiteNotFound(site_id));
        }

        tx.commit()?;
        Ok(pages as u64)
    }

    fn find_sites_by_status(&self, status: SiteStatus) -> StorageResult<Vec<SiteRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM site WHERE status = ?1 ORDER BY id",
            SITE_COLUMNS
        ))?;

        let sites = stmt
            .query_map(params![status.to_db_string()], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM site ORDER BY id", SITE_COLUMNS))?;

        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn update_site_status(
        &self,
        site_id: i64,
        expected: SiteStatus,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<bool> {
        if !expected.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                from: expected,
                to: status,
            });
        }

        let updated = self.conn().execute(
            "UPDATE site SET status = ?1, status_time = ?2, last_error = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                status.to_db_string(),
                Utc::now(),
                last_error,
                site_id,
                expected.to_db_string()
            ],
        )?;
        Ok(updated > 0)
    }
}

impl PageStore for SqliteStorage {
    fn save_page(&self, page: &NewPage) -> StorageResult<PageRecord> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO page (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)",
            params![page.site_id, page.path, page.code, page.content],
        )?;

        Ok(PageRecord {
            id: conn.last_insert_rowid(),
            site_id: page.site_id,
            path: page.path.clone(),
            code: page.code,
            content: page.content.clone(),
        })
    }

    fn delete_pages_by_site(&self, site_id: i64) -> StorageResult<u64> {
        let deleted = self
            .conn()
            .execute("DELETE FROM page WHERE site_id = ?1", params![site_id])?;
        Ok(deleted as u64)
    }

    fn find_pages_by_site(&self, site_id: i64) -> StorageResult<Vec<PageRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, site_id, path, code, content FROM page WHERE site_id = ?1 ORDER BY id",
        )?;

        let pages = stmt
            .query_map(params![site_id], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    fn count_pages_by_site(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM page WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_pages_by_code(&self, site_id: i64) -> StorageResult<BTreeMap<u16, u64>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT code, COUNT(*) FROM page WHERE site_id = ?1 GROUP BY code")?;

        let counts = stmt
            .query_map(params![site_id], |row| {
                Ok((row.get::<_, u16>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(counts)
    }
}
