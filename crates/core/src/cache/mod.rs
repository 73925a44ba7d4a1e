//! URL-keyed response cache with SQLite persistence.
//!
//! - `CacheStore` is the in-memory map the fetch pipeline reads and writes
//! - `CacheDb` persists full snapshots of that map through tokio-rusqlite
//! - Expired entries are pruned on both load and save

pub mod connection;
pub mod entries;
pub mod entry;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entry::{CACHED_HEADERS, CacheEntry, now_millis};
pub use store::CacheStore;
