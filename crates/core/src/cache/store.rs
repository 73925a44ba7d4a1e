//! In-memory URL → entry map with explicit load/save persistence.
//!
//! The store is constructed once per process and passed by `&mut` to
//! whatever drives fetches. It has no internal locking. Persistence
//! failures never propagate out of [`CacheStore::load`] or
//! [`CacheStore::save`]; they are logged and the in-memory map keeps working.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::connection::CacheDb;
use super::entry::{CacheEntry, now_millis};
use crate::Error;

/// URL-keyed cache of processed responses.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    path: Option<PathBuf>,
    db: Option<CacheDb>,
}

impl CacheStore {
    /// Store persisted to the SQLite file at `path`.
    ///
    /// Nothing is read until [`CacheStore::load`] is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { entries: HashMap::new(), path: Some(path.into()), db: None }
    }

    /// Store without any persistence; load and save are no-ops.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Store backed by an already-open database.
    pub fn with_db(db: CacheDb) -> Self {
        Self { entries: HashMap::new(), path: None, db: Some(db) }
    }

    /// Fresh entry for `url`, if any. Expired entries are treated as missing.
    pub fn get(&self, url: &str) -> Option<&CacheEntry> {
        self.get_at(url, now_millis())
    }

    /// Fresh entry for `url` as of `now` (epoch millis).
    pub fn get_at(&self, url: &str, now: i64) -> Option<&CacheEntry> {
        self.entries.get(url).filter(|entry| !entry.is_expired_at(now))
    }

    /// Entry for `url` that is present but already expired.
    ///
    /// Only useful as a source of validators for a conditional request.
    pub fn stale(&self, url: &str) -> Option<&CacheEntry> {
        self.stale_at(url, now_millis())
    }

    /// Present-but-expired entry for `url` as of `now` (epoch millis).
    pub fn stale_at(&self, url: &str, now: i64) -> Option<&CacheEntry> {
        self.entries.get(url).filter(|entry| entry.is_expired_at(now))
    }

    /// Insert or replace the entry for this exact URL string.
    pub fn put(&mut self, url: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(url.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all held entries, fresh or not.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(url, entry)| (url.as_str(), entry))
    }

    /// Drop entries expired as of `now`, returning how many were removed.
    pub fn prune_expired_at(&mut self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    /// Merge the persisted snapshot into memory, skipping expired entries.
    ///
    /// A missing file starts empty; a file that is not a database is moved
    /// aside and replaced. Returns the number of entries merged.
    pub async fn load(&mut self) -> usize {
        match self.try_load().await {
            Ok(count) => {
                tracing::info!(count, "loaded cache entries");
                count
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load cache; starting empty");
                0
            }
        }
    }

    /// Like [`CacheStore::load`] but surfaces the failure.
    pub async fn try_load(&mut self) -> Result<usize, Error> {
        let Some(db) = self.connection().await? else {
            return Ok(0);
        };

        let now = now_millis();
        let mut merged = 0;
        for (url, entry) in db.load_entries().await? {
            if entry.is_expired_at(now) {
                continue;
            }
            self.entries.insert(url, entry);
            merged += 1;
        }

        Ok(merged)
    }

    /// Prune expired entries and persist the full snapshot.
    ///
    /// Returns the number of entries written (0 on failure).
    pub async fn save(&mut self) -> usize {
        match self.try_save().await {
            Ok(count) => {
                tracing::info!(count, "saved cache entries");
                count
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to save cache");
                0
            }
        }
    }

    /// Like [`CacheStore::save`] but surfaces the failure.
    pub async fn try_save(&mut self) -> Result<usize, Error> {
        let pruned = self.prune_expired_at(now_millis());
        if pruned > 0 {
            tracing::debug!(pruned, "pruned expired cache entries");
        }

        let Some(db) = self.connection().await? else {
            return Ok(0);
        };

        let snapshot = self
            .entries
            .iter()
            .map(|(url, entry)| (url.clone(), entry.clone()))
            .collect();
        db.replace_entries(snapshot).await
    }

    /// Database handle, opening the cache file on first use.
    ///
    /// `None` means the store has no persistence configured.
    async fn connection(&mut self) -> Result<Option<CacheDb>, Error> {
        if let Some(db) = &self.db {
            return Ok(Some(db.clone()));
        }
        let Some(path) = self.path.clone() else {
            return Ok(None);
        };

        let db = match CacheDb::open(&path).await {
            Ok(db) => db,
            Err(e) if e.is_corrupt_database() => {
                tracing::warn!(path = %path.display(), error = %e, "cache file is not a usable database; moving it aside");
                quarantine(&path).await?;
                CacheDb::open(&path).await?
            }
            Err(e) => return Err(e),
        };

        self.db = Some(db.clone());
        Ok(Some(db))
    }
}

/// Rename an unreadable cache file to `<name>.corrupt` so a fresh one can be created.
async fn quarantine(path: &Path) -> Result<(), Error> {
    let target = path.with_extension("corrupt");
    tokio::fs::rename(path, &target)
        .await
        .map_err(|e| Error::CacheIo(format!("failed to move {} aside: {e}", path.display())))?;

    for suffix in ["-wal", "-shm"] {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(suffix);
        let _ = tokio::fs::remove_file(PathBuf::from(sidecar)).await;
    }

    Ok(())
}
