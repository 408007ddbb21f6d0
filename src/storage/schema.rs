//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Site-Indexer database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per configured site for its current run
CREATE TABLE IF NOT EXISTS site (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    status TEXT NOT NULL CHECK (status IN ('INDEXING', 'INDEXED', 'FAILED')),
    status_time TEXT NOT NULL,
    last_error TEXT,
    url VARCHAR(255) NOT NULL,
    name VARCHAR(255) NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_site_url ON site(url);
CREATE INDEX IF NOT EXISTS idx_site_status ON site(status);

-- One row per unique URL fetched during a site's run
CREATE TABLE IF NOT EXISTS page (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES site(id),
    path VARCHAR(255) NOT NULL,
    code INTEGER NOT NULL,
    content TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_path ON page(path);
CREATE INDEX IF NOT EXISTS idx_page_site ON page(site_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
