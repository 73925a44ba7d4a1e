//! Expiration computation from response caching headers.
//!
//! Rules, first match wins:
//! 1. `Cache-Control` containing `no-cache` or `no-store` → 0 (always expired)
//! 2. `max-age=N` → 0 when N ≤ 0, else `now + N s`
//! 3. `Expires` in IMF-fixdate form → that instant
//! 4. `now + default_ttl`
//!
//! A malformed `max-age` or `Expires` falls through to the next rule.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use go2web_core::cache::CACHED_HEADERS;

use crate::http::Headers;

const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Absolute expiration in epoch milliseconds.
pub fn expiration_time(cache_control: Option<&str>, expires: Option<&str>, now_ms: i64, default_ttl_ms: i64) -> i64 {
    if let Some(cc) = cache_control {
        let lowered = cc.to_ascii_lowercase();
        if lowered.contains("no-cache") || lowered.contains("no-store") {
            return 0;
        }
        if let Some(max_age) = max_age(&lowered) {
            if max_age <= 0 {
                return 0;
            }
            return now_ms.saturating_add(max_age.saturating_mul(1000));
        }
    }

    if let Some(at) = expires.and_then(parse_expires) {
        return at;
    }

    now_ms.saturating_add(default_ttl_ms)
}

fn max_age(cache_control: &str) -> Option<i64> {
    cache_control.split(',').find_map(|directive| {
        let (name, value) = directive.split_once('=')?;
        if name.trim() != "max-age" {
            return None;
        }
        value.trim().trim_matches('"').parse::<i64>().ok()
    })
}

fn parse_expires(value: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(value.trim(), EXPIRES_FORMAT)
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// The subset of response headers kept with a cache entry, under canonical names.
pub fn select_cache_headers(headers: &Headers) -> BTreeMap<String, String> {
    CACHED_HEADERS
        .iter()
        .filter_map(|name| headers.get(name).map(|value| (name.to_string(), value.to_string())))
        .collect()
}
