//! Cached rendition of one fetched URL.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response headers kept alongside cached content.
pub const CACHED_HEADERS: [&str; 5] = ["ETag", "Last-Modified", "Cache-Control", "Expires", "Content-Type"];

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A cached rendition of a fetched URL.
///
/// `content` is the processed text shown to the user, not the raw body.
/// `expiration_time` is an absolute instant in epoch milliseconds fixed when
/// the entry is built; `0` marks an entry that is expired from birth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content: String,
    pub headers: BTreeMap<String, String>,
    pub expiration_time: i64,
}

impl CacheEntry {
    pub fn new(content: impl Into<String>, headers: BTreeMap<String, String>, expiration_time: i64) -> Self {
        Self { content: content.into(), headers, expiration_time }
    }

    /// Whether the entry is past its expiration at `now` (epoch millis).
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expiration_time
    }

    /// Stored header value, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn etag(&self) -> Option<&str> {
        self.header("ETag")
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.header("Last-Modified")
    }

    /// Whether the entry carries anything usable for a conditional request.
    pub fn has_validators(&self) -> bool {
        self.etag().is_some() || self.last_modified().is_some()
    }
}
