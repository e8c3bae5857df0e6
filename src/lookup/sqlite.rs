//! `SQLite`-backed lookup table

use std::path::Path;

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;

use super::{LocalLookup, LookupEntry, first_match};
use crate::{Error, Result};

/// Table holding `Query` / `Response` rows; row order is `rowid`
pub const LOOKUP_TABLE: &str = "lookup";

/// Read-only lookup over a `SQLite` table
///
/// Rows are re-read on every query so edits made by other tools show up
/// without a restart.
#[derive(Clone)]
pub struct SqliteLookup {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteLookup {
    /// Open a database file read-only
    ///
    /// # Errors
    ///
    /// Returns error if the connection pool cannot be created
    pub fn open(path: &Path) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX);
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| Error::Database(e.to_string()))?;

        tracing::info!(path = %path.display(), "opened lookup database");
        Ok(Self { pool })
    }

    /// Read all rows in store order
    ///
    /// # Errors
    ///
    /// Returns error if the table is missing or unreadable
    pub fn entries(&self) -> Result<Vec<LookupEntry>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT Query, Response FROM {LOOKUP_TABLE} ORDER BY rowid"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(LookupEntry {
                query: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                response: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

#[async_trait]
impl LocalLookup for SqliteLookup {
    async fn find(&self, query: &str) -> Result<Option<String>> {
        let this = self.clone();
        let query = query.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<String>> {
            let entries = this.entries()?;
            Ok(first_match(&entries, &query).map(|entry| entry.response.clone()))
        })
        .await
        .map_err(|e| Error::Lookup(format!("lookup task failed: {e}")))?
        .map_err(|e| Error::Lookup(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
