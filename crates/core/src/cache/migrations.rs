//! Cache schema migrations.
//!
//! Applied versions are recorded in `_migrations`; pending ones run in a
//! single transaction so a failed upgrade leaves the previous schema intact.

use tokio_rusqlite::{Connection, params, rusqlite};

use super::Error;

/// Schema versions in application order.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_cache_entries.sql"))];

const CREATE_VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
)";

/// Bring the schema up to date, returning the resulting schema version.
pub async fn run(conn: &Connection) -> Result<i64, Error> {
    conn.call(|conn| -> Result<i64, Error> {
        let tx = conn.transaction()?;
        tx.execute_batch(CREATE_VERSION_TABLE)?;

        let applied = applied_version(&tx)?;
        let mut version = applied;
        for &(target, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > applied) {
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {target}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![target, chrono::Utc::now().to_rfc3339()],
            )?;
            tracing::debug!(version = target, "applied cache migration");
            version = target;
        }

        tx.commit()?;
        Ok(version)
    })
    .await
    .map_err(Error::from)
}

fn applied_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    Ok(conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?)
}
