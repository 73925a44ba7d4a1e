//! Snapshot read/write operations on the `cache_entries` table.
//!
//! The table always holds one complete snapshot of the in-memory store:
//! writes replace every row inside a single transaction.

use super::connection::CacheDb;
use super::entry::CacheEntry;
use crate::Error;
use std::collections::BTreeMap;
use tokio_rusqlite::params;

/// Raw row as stored; headers are still JSON text.
struct EntryRow {
    url: String,
    content: String,
    headers_json: String,
    expiration_time: i64,
}

impl CacheDb {
    /// Read every persisted entry.
    ///
    /// Rows whose headers cannot be decoded are skipped with a warning.
    pub async fn load_entries(&self) -> Result<Vec<(String, CacheEntry)>, Error> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<EntryRow>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url, content, headers_json, expiration_time FROM cache_entries")?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(EntryRow {
                            url: row.get(0)?,
                            content: row.get(1)?,
                            headers_json: row.get(2)?,
                            expiration_time: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str::<BTreeMap<String, String>>(&row.headers_json) {
                Ok(headers) => {
                    entries.push((row.url, CacheEntry::new(row.content, headers, row.expiration_time)));
                }
                Err(e) => tracing::warn!(url = %row.url, error = %e, "skipping cache row with unreadable headers"),
            }
        }

        Ok(entries)
    }

    /// Replace the persisted snapshot with `entries`.
    ///
    /// Returns the number of rows written.
    pub async fn replace_entries(&self, entries: Vec<(String, CacheEntry)>) -> Result<usize, Error> {
        let stored_at = chrono::Utc::now().to_rfc3339();
        let mut encoded = Vec::with_capacity(entries.len());
        for (url, entry) in entries {
            let headers_json = serde_json::to_string(&entry.headers)
                .map_err(|e| Error::CacheIo(format!("failed to encode headers for {url}: {e}")))?;
            encoded.push(EntryRow { url, content: entry.content, headers_json, expiration_time: entry.expiration_time });
        }

        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries", [])?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO cache_entries (url, content, headers_json, expiration_time, stored_at)
                        VALUES (?1, ?2, ?3, ?4, ?5)",
                    )?;
                    for row in &encoded {
                        stmt.execute(params![row.url, row.content, row.headers_json, row.expiration_time, stored_at])?;
                    }
                }
                tx.commit()?;
                Ok(encoded.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of persisted rows.
    pub async fn count_entries(&self) -> Result<usize, Error> {
        self.conn
            .call(|conn| -> Result<usize, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }
}
