//! Cache-aware fetch pipeline.
//!
//! ### Per URL
//! - Fresh cache entry → served without touching the network
//! - Otherwise a GET, conditional when a stale entry with validators is held
//! - `304` → stale entry refreshed and served
//! - `3xx` → `Location` resolved and the loop restarts (bounded hop count)
//! - Anything else → processed, cached under the final URL, persisted
//!
//! ### Expiration
//! See [`freshness::expiration_time`].

pub mod freshness;
pub mod url;

use std::sync::Arc;
use std::time::Duration;

use go2web_core::cache::{CACHED_HEADERS, now_millis};
use go2web_core::{AppConfig, CacheEntry, CacheStore, Error};
use ::url::Url;

use crate::extract::{ContentProcessor, DefaultProcessor};
use crate::http::{HttpClient, HttpConfig, HttpRequest, HttpResponse, HttpTransport};

pub use freshness::{expiration_time, select_cache_headers};
pub use self::url::{UrlError, canonicalize, resolve_redirect};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub http: HttpConfig,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Lifetime of responses without caching headers (default: 1h)
    pub default_ttl: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { http: HttpConfig::from(config), max_redirects: config.max_redirects, default_ttl: config.default_ttl() }
    }
}

/// Where the returned content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Fresh cache entry; no request was sent.
    Cache,
    /// Stale entry confirmed by a `304 Not Modified`.
    Revalidated,
    /// Full response from the origin.
    Network,
}

/// Result of one logical fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Canonicalized input URL
    pub url: String,
    /// URL the content was served for, after redirects
    pub final_url: String,
    /// Status of the last response; `None` when served from cache
    pub status: Option<u16>,
    pub content: String,
    pub source: FetchSource,
    pub redirects: usize,
}

/// Fetch orchestrator: cache lookup, conditional and full requests, redirects.
pub struct FetchClient {
    transport: Arc<dyn HttpTransport>,
    processor: Arc<dyn ContentProcessor>,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a client speaking real HTTP with the default content processor.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let transport = HttpClient::new(&config.http)?.shared();
        Ok(Self::with_parts(transport, Arc::new(DefaultProcessor), config))
    }

    /// Create a client over an arbitrary transport and processor.
    pub fn with_parts(
        transport: Arc<dyn HttpTransport>, processor: Arc<dyn ContentProcessor>, config: FetchConfig,
    ) -> Self {
        Self { transport, processor, config }
    }

    /// Fetch `input`, consulting and updating `cache`.
    pub async fn fetch(&self, cache: &mut CacheStore, input: &str) -> Result<FetchOutcome, Error> {
        let requested = canonicalize(input)?;
        let mut current = requested.clone();
        let mut redirects = 0usize;

        loop {
            if let Some(entry) = cache.get(current.as_str()) {
                tracing::debug!(url = %current, "cache hit");
                return Ok(FetchOutcome {
                    url: requested.to_string(),
                    final_url: current.to_string(),
                    status: None,
                    content: entry.content.clone(),
                    source: FetchSource::Cache,
                    redirects,
                });
            }

            let stale = cache.stale(current.as_str()).filter(|e| e.has_validators()).cloned();
            let request = conditional_get(current.clone(), stale.as_ref());
            tracing::debug!(url = %current, conditional = stale.is_some(), "sending request");

            let response = self.transport.send(&request).await?;

            if (100..200).contains(&response.status) {
                return Err(Error::Protocol(format!("interim {} response for {current} has no content", response.status)));
            }

            if response.status == 304 {
                let Some(entry) = stale else {
                    return Err(Error::Protocol(format!("304 Not Modified for {current} without a cached entry")));
                };
                let content = self.revalidate(cache, &current, entry, &response).await;
                return Ok(FetchOutcome {
                    url: requested.to_string(),
                    final_url: current.to_string(),
                    status: Some(304),
                    content,
                    source: FetchSource::Revalidated,
                    redirects,
                });
            }

            if response.is_redirect() {
                let next = self.redirect_target(&current, &response)?;
                redirects += 1;
                if redirects > self.config.max_redirects {
                    return Err(Error::RedirectLoop { max: self.config.max_redirects, url: next.to_string() });
                }
                tracing::debug!(status = response.status, from = %current, to = %next, hop = redirects, "following redirect");
                current = next;
                continue;
            }

            let content = self.store(cache, &current, &response).await;
            return Ok(FetchOutcome {
                url: requested.to_string(),
                final_url: current.to_string(),
                status: Some(response.status),
                content,
                source: FetchSource::Network,
                redirects,
            });
        }
    }

    fn redirect_target(&self, current: &Url, response: &HttpResponse) -> Result<Url, Error> {
        let location = response
            .header("Location")
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| Error::Protocol(format!("{} redirect from {current} without Location", response.status)))?;
        Ok(resolve_redirect(current, location)?)
    }

    /// Process a full response, cache it under `url` and persist the store.
    async fn store(&self, cache: &mut CacheStore, url: &Url, response: &HttpResponse) -> String {
        if response.status >= 400 {
            tracing::warn!(url = %url, status = response.status, "error response");
        }

        let content_type = response.media_type().unwrap_or_else(|| "text/html".to_string());
        let content = self.processor.process(&response.body, &content_type);

        let expiration = expiration_time(
            response.header("Cache-Control"),
            response.header("Expires"),
            now_millis(),
            self.default_ttl_ms(),
        );
        let entry = CacheEntry::new(content.clone(), select_cache_headers(&response.headers), expiration);
        cache.put(url.as_str(), entry);
        cache.save().await;

        content
    }

    /// Refresh a stale entry from a `304` and persist it.
    async fn revalidate(&self, cache: &mut CacheStore, url: &Url, mut entry: CacheEntry, response: &HttpResponse) -> String {
        for name in CACHED_HEADERS {
            if let Some(value) = response.header(name) {
                entry.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
                entry.headers.insert(name.to_string(), value.to_string());
            }
        }
        entry.expiration_time = expiration_time(
            entry.header("Cache-Control"),
            entry.header("Expires"),
            now_millis(),
            self.default_ttl_ms(),
        );
        tracing::debug!(url = %url, expiration = entry.expiration_time, "revalidated");

        let content = entry.content.clone();
        cache.put(url.as_str(), entry);
        cache.save().await;
        content
    }

    fn default_ttl_ms(&self) -> i64 {
        i64::try_from(self.config.default_ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

fn conditional_get(url: Url, stale: Option<&CacheEntry>) -> HttpRequest {
    let mut request = HttpRequest::get(url);
    if let Some(entry) = stale {
        if let Some(etag) = entry.etag() {
            request = request.with_header("If-None-Match", etag);
        }
        if let Some(modified) = entry.last_modified() {
            request = request.with_header("If-Modified-Since", modified);
        }
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    use crate::http::Headers;

    /// Replays canned responses and records every request.
    #[derive(Default)]
    struct MockTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        fn new(responses: Vec<HttpResponse>) -> Arc<Self> {
            Arc::new(Self { responses: Mutex::new(responses.into()), requests: Mutex::default() })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::Transport("no more canned responses".into()))
        }
    }

    fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
        let headers: Headers = headers.iter().map(|(k, v)| (*k, *v)).collect();
        HttpResponse::new(status, "", headers, Bytes::from(body.to_string()))
    }

    fn client(transport: Arc<MockTransport>) -> FetchClient {
        FetchClient::with_parts(transport, Arc::new(DefaultProcessor), FetchConfig::default())
    }

    #[tokio::test]
    async fn test_second_fetch_served_from_cache() {
        let transport = MockTransport::new(vec![response(
            200,
            &[("Content-Type", "text/plain"), ("Cache-Control", "max-age=300")],
            "hello",
        )]);
        let fetcher = client(transport.clone());
        let mut cache = CacheStore::in_memory();

        let first = fetcher.fetch(&mut cache, "http://example.test/").await.unwrap();
        let second = fetcher.fetch(&mut cache, "http://example.test/").await.unwrap();

        assert_eq!(first.source, FetchSource::Network);
        assert_eq!(first.status, Some(200));
        assert_eq!(second.source, FetchSource::Cache);
        assert_eq!(second.status, None);
        assert_eq!(first.content, "hello");
        assert_eq!(first.content, second.content);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cached_entry_keeps_selected_headers() {
        let transport = MockTransport::new(vec![response(
            200,
            &[("content-type", "text/plain; charset=utf-8"), ("etag", "\"v1\""), ("Server", "x")],
            "body",
        )]);
        let mut cache = CacheStore::in_memory();
        client(transport).fetch(&mut cache, "http://example.test/").await.unwrap();

        let entry = cache.get("http://example.test/").unwrap();
        assert_eq!(entry.etag(), Some("\"v1\""));
        assert_eq!(entry.header("Content-Type"), Some("text/plain; charset=utf-8"));
        assert!(entry.header("Server").is_none());
    }

    #[tokio::test]
    async fn test_follows_each_redirect_status() {
        for status in [301, 302, 303, 307, 308] {
            let transport = MockTransport::new(vec![
                response(status, &[("Location", "/moved?x=1")], ""),
                response(200, &[("Content-Type", "text/plain")], "arrived"),
            ]);
            let mut cache = CacheStore::in_memory();
            let outcome = client(transport.clone())
                .fetch(&mut cache, "https://example.test/start")
                .await
                .unwrap();

            let requests = transport.requests();
            assert_eq!(requests.len(), 2, "status {status}");
            assert_eq!(requests[1].url.as_str(), "https://example.test/moved?x=1");
            assert_eq!(outcome.final_url, "https://example.test/moved?x=1");
            assert_eq!(outcome.url, "https://example.test/start");
            assert_eq!(outcome.redirects, 1);
            assert_eq!(outcome.content, "arrived");
            assert!(cache.get("https://example.test/moved?x=1").is_some());
            assert!(cache.get("https://example.test/start").is_none());
        }
    }

    #[tokio::test]
    async fn test_redirect_loop_stops_after_limit() {
        let responses = (0..10)
            .map(|i| response(302, &[("Location", format!("/hop{i}").as_str())], ""))
            .collect();
        let transport = MockTransport::new(responses);
        let mut cache = CacheStore::in_memory();

        let err = client(transport.clone())
            .fetch(&mut cache, "http://example.test/")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RedirectLoop { max: 5, .. }));
        assert_eq!(transport.requests().len(), 6);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_redirect_without_location_is_protocol_error() {
        let transport = MockTransport::new(vec![response(301, &[("Location", "  ")], "")]);
        let mut cache = CacheStore::in_memory();
        let err = client(transport).fetch(&mut cache, "http://example.test/").await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_redirect_to_cached_target_skips_network() {
        let transport = MockTransport::new(vec![response(301, &[("Location", "https://example.test/new")], "")]);
        let mut cache = CacheStore::in_memory();
        cache.put("https://example.test/new", CacheEntry::new("cached", BTreeMap::new(), i64::MAX));

        let outcome = client(transport.clone())
            .fetch(&mut cache, "http://example.test/old")
            .await
            .unwrap();
        assert_eq!(outcome.source, FetchSource::Cache);
        assert_eq!(outcome.content, "cached");
        assert_eq!(outcome.redirects, 1);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_revalidated_by_304() {
        let transport = MockTransport::new(vec![response(304, &[("Cache-Control", "max-age=60")], "")]);
        let mut cache = CacheStore::in_memory();
        let mut headers = BTreeMap::new();
        headers.insert("ETag".to_string(), "\"v1\"".to_string());
        headers.insert("Last-Modified".to_string(), "Wed, 21 Oct 2015 07:28:00 GMT".to_string());
        headers.insert("Cache-Control".to_string(), "max-age=1".to_string());
        cache.put("http://example.test/", CacheEntry::new("old content", headers, 1));

        let before = now_millis();
        let outcome = client(transport.clone()).fetch(&mut cache, "http://example.test/").await.unwrap();

        assert_eq!(outcome.source, FetchSource::Revalidated);
        assert_eq!(outcome.status, Some(304));
        assert_eq!(outcome.content, "old content");

        let request = &transport.requests()[0];
        assert_eq!(request.headers.get("If-None-Match"), Some("\"v1\""));
        assert_eq!(request.headers.get("If-Modified-Since"), Some("Wed, 21 Oct 2015 07:28:00 GMT"));

        let entry = cache.get("http://example.test/").unwrap();
        assert_eq!(entry.header("Cache-Control"), Some("max-age=60"));
        assert!(entry.expiration_time >= before + 60_000);
    }

    #[tokio::test]
    async fn test_304_without_entry_is_protocol_error() {
        let transport = MockTransport::new(vec![response(304, &[], "")]);
        let mut cache = CacheStore::in_memory();
        let err = client(transport).fetch(&mut cache, "http://example.test/").await.unwrap_err();
        assert!(matches!(err, Error::Protocol(msg) if msg.contains("304")));
    }

    #[tokio::test]
    async fn test_interim_response_never_cached() {
        let transport = MockTransport::new(vec![response(103, &[("Link", "</a.css>; rel=preload")], "")]);
        let mut cache = CacheStore::in_memory();
        let err = client(transport).fetch(&mut cache, "http://example.test/").await.unwrap_err();
        assert!(matches!(err, Error::Protocol(msg) if msg.contains("103")));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_unconditional_when_no_stale_entry() {
        let transport = MockTransport::new(vec![response(200, &[], "<p>x</p>")]);
        let mut cache = CacheStore::in_memory();
        client(transport.clone()).fetch(&mut cache, "http://example.test/").await.unwrap();

        let request = &transport.requests()[0];
        assert!(!request.headers.contains("If-None-Match"));
        assert!(!request.headers.contains("If-Modified-Since"));
    }

    #[tokio::test]
    async fn test_no_store_response_served_but_not_kept() {
        let transport = MockTransport::new(vec![
            response(200, &[("Content-Type", "text/plain"), ("Cache-Control", "no-store")], "one"),
            response(200, &[("Content-Type", "text/plain"), ("Cache-Control", "no-store")], "two"),
        ]);
        let fetcher = client(transport.clone());
        let mut cache = CacheStore::in_memory();

        assert_eq!(fetcher.fetch(&mut cache, "http://example.test/").await.unwrap().content, "one");
        assert_eq!(fetcher.fetch(&mut cache, "http://example.test/").await.unwrap().content, "two");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_error_status_processed_and_cached() {
        let transport = MockTransport::new(vec![response(404, &[("Content-Type", "text/plain")], "not here")]);
        let mut cache = CacheStore::in_memory();
        let outcome = client(transport).fetch(&mut cache, "http://example.test/missing").await.unwrap();
        assert_eq!(outcome.status, Some(404));
        assert_eq!(outcome.content, "not here");
        assert!(cache.get("http://example.test/missing").is_some());
    }

    #[tokio::test]
    async fn test_json_pretty_printed() {
        let transport = MockTransport::new(vec![response(
            200,
            &[("Content-Type", "application/json; charset=utf-8")],
            r#"{"a":1}"#,
        )]);
        let mut cache = CacheStore::in_memory();
        let outcome = client(transport).fetch(&mut cache, "https://api.test/v1").await.unwrap();
        assert_eq!(outcome.content, "{\n  \"a\": 1\n}");
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_request() {
        let transport = MockTransport::new(vec![]);
        let mut cache = CacheStore::in_memory();
        let err = client(transport.clone()).fetch(&mut cache, "ftp://example.test/").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_cache_untouched() {
        let transport = MockTransport::new(vec![]);
        let mut cache = CacheStore::in_memory();
        let err = client(transport).fetch(&mut cache, "http://example.test/").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_persists_through_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        let transport = MockTransport::new(vec![response(
            200,
            &[("Content-Type", "text/plain"), ("Cache-Control", "max-age=600")],
            "persisted",
        )]);

        let mut cache = CacheStore::new(&path);
        client(transport).fetch(&mut cache, "http://example.test/").await.unwrap();

        let mut reloaded = CacheStore::new(&path);
        assert_eq!(reloaded.load().await, 1);
        assert_eq!(reloaded.get("http://example.test/").map(|e| e.content.as_str()), Some("persisted"));
    }

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig { max_redirects: 3, default_ttl_secs: 10, ..AppConfig::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.max_redirects, 3);
        assert_eq!(config.default_ttl, Duration::from_secs(10));
        assert_eq!(config.http.user_agent, app.user_agent);
    }
}
