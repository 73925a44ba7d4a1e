//! HTML search client.
//!
//! Queries the DuckDuckGo HTML endpoint with a form POST and scrapes the
//! result anchors from the returned page.
//!
//! ### Protocol
//!
//! - **Endpoint**: `https://html.duckduckgo.com/html/` (configurable)
//! - **Request**: `q`, `kl`, `dt=t` form-encoded; `Referer` set to the endpoint origin
//! - **Redirects**: one redirect is followed with a GET
//! - **Results**: at most 10, engine-internal links dropped, duplicates removed

pub mod error;
pub mod request;
pub mod response;

pub use error::SearchError;
pub use request::SearchRequest;
pub use response::{SearchResult, parse_results};

use std::sync::Arc;

use go2web_core::AppConfig;
use url::Url;

use crate::fetch::resolve_redirect;
use crate::http::{HttpClient, HttpConfig, HttpRequest, HttpResponse, HttpTransport};

/// Upper bound on presented results.
pub const MAX_RESULTS: usize = 10;

/// Browser user agent the HTML endpoint serves full result pages to.
pub const SEARCH_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";

/// Search client configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Form endpoint (default: https://html.duckduckgo.com/html/).
    pub endpoint: String,
    /// Results returned (1-10, default 10).
    pub max_results: usize,
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SearchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            endpoint: config.search_endpoint.clone(),
            max_results: config.max_search_results,
            user_agent: SEARCH_USER_AGENT.to_string(),
        }
    }
}

/// Search client over an [`HttpTransport`].
pub struct SearchClient {
    transport: Arc<dyn HttpTransport>,
    config: SearchConfig,
}

impl SearchClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: SearchConfig) -> Self {
        Self { transport, config }
    }

    /// Create a client with its own HTTP connection settings.
    pub fn from_config(http: &HttpConfig, config: SearchConfig) -> Result<Self, SearchError> {
        Ok(Self::new(HttpClient::new(http)?.shared(), config))
    }

    /// Run a search and return the ranked results.
    pub async fn search(&self, req: &SearchRequest) -> Result<Vec<SearchResult>, SearchError> {
        req.validate()?;
        let endpoint = self.endpoint()?;

        tracing::debug!(query = %req.query(), endpoint = %endpoint, "searching");

        let request = HttpRequest::post(endpoint.clone(), req.form_body())
            .with_header("User-Agent", self.config.user_agent.as_str())
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_header("Accept", "text/html")
            .with_header("Referer", referer(&endpoint));

        let mut page_url = endpoint;
        let mut response = self.transport.send(&request).await?;

        if response.is_redirect() {
            let next = redirect_location(&page_url, &response)?;
            tracing::debug!(status = response.status, to = %next, "search redirected");
            let follow = HttpRequest::get(next.clone())
                .with_header("User-Agent", self.config.user_agent.as_str())
                .with_header("Accept", "text/html");
            response = self.transport.send(&follow).await?;
            page_url = next;
        }

        if response.status != 200 {
            return Err(SearchError::HttpError { status: response.status });
        }

        let limit = self.config.max_results.clamp(1, MAX_RESULTS);
        let results = parse_results(&response.body_text(), &page_url, limit);
        tracing::debug!(count = results.len(), "search completed");
        Ok(results)
    }

    fn endpoint(&self) -> Result<Url, SearchError> {
        let url = Url::parse(&self.config.endpoint)
            .map_err(|e| SearchError::InvalidEndpoint(format!("{}: {e}", self.config.endpoint)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SearchError::InvalidEndpoint(self.config.endpoint.clone()));
        }
        Ok(url)
    }
}

fn redirect_location(current: &Url, response: &HttpResponse) -> Result<Url, SearchError> {
    let location = response
        .header("Location")
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| SearchError::BadRedirect(format!("{} without Location", response.status)))?;
    resolve_redirect(current, location).map_err(|e| SearchError::BadRedirect(e.to_string()))
}

/// Origin of the endpoint with a trailing slash.
fn referer(endpoint: &Url) -> String {
    format!("{}/", endpoint.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use go2web_core::Error;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::http::{Headers, Method};

    #[derive(Default)]
    struct MockTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::Transport("connection refused".into()))
        }
    }

    fn mock(responses: Vec<HttpResponse>) -> Arc<MockTransport> {
        Arc::new(MockTransport { responses: Mutex::new(responses.into()), requests: Mutex::default() })
    }

    fn page(links: &[&str]) -> HttpResponse {
        let body: String = links
            .iter()
            .map(|href| format!(r#"<div class="result"><a class="result__a" href="{href}">Title for {href}</a></div>"#))
            .collect();
        let headers: Headers = [("Content-Type", "text/html")].into_iter().collect();
        HttpResponse::new(200, "OK", headers, Bytes::from(format!("<html><body>{body}</body></html>")))
    }

    #[tokio::test]
    async fn test_search_posts_form() {
        let transport = mock(vec![page(&["https://a.test/", "https://b.test/"])]);
        let client = SearchClient::new(transport.clone(), SearchConfig::default());

        let results = client.search(&SearchRequest::new(["rust", "lang"])).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://a.test/");

        let requests = transport.requests.lock().unwrap();
        let sent = &requests[0];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.url.as_str(), "https://html.duckduckgo.com/html/");
        assert_eq!(sent.headers.get("Content-Type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(sent.headers.get("Referer"), Some("https://html.duckduckgo.com/"));
        assert_eq!(sent.body.as_deref(), Some(&b"q=rust+lang&kl=us-en&dt=t"[..]));
    }

    #[tokio::test]
    async fn test_search_follows_one_redirect() {
        let redirect = HttpResponse::new(
            302,
            "Found",
            [("Location", "/html/?q=rust")].into_iter().collect(),
            Bytes::new(),
        );
        let transport = mock(vec![redirect, page(&["https://a.test/"])]);
        let client = SearchClient::new(transport.clone(), SearchConfig::default());

        let results = client.search(&SearchRequest::new(["rust"])).await.unwrap();
        assert_eq!(results.len(), 1);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, Method::Get);
        assert_eq!(requests[1].url.as_str(), "https://html.duckduckgo.com/html/?q=rust");
    }

    #[tokio::test]
    async fn test_non_200_is_error() {
        let transport = mock(vec![HttpResponse::new(403, "Forbidden", Headers::new(), Bytes::new())]);
        let client = SearchClient::new(transport, SearchConfig::default());
        let err = client.search(&SearchRequest::new(["rust"])).await.unwrap_err();
        assert!(matches!(err, SearchError::HttpError { status: 403 }));
    }

    #[tokio::test]
    async fn test_results_capped() {
        let links: Vec<String> = (0..15).map(|i| format!("https://site{i}.test/")).collect();
        let refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let transport = mock(vec![page(&refs)]);
        let config = SearchConfig { max_results: 50, ..SearchConfig::default() };
        let client = SearchClient::new(transport, config);

        let results = client.search(&SearchRequest::new(["many"])).await.unwrap();
        assert_eq!(results.len(), MAX_RESULTS);
        assert_eq!(results.last().unwrap().rank, 10);
    }

    #[tokio::test]
    async fn test_empty_query_sends_nothing() {
        let transport = mock(vec![]);
        let client = SearchClient::new(transport.clone(), SearchConfig::default());
        let err = client.search(&SearchRequest::new([""])).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery(_)));
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let client = SearchClient::new(mock(vec![]), SearchConfig::default());
        let err = client.search(&SearchRequest::new(["rust"])).await.unwrap_err();
        assert!(matches!(err, SearchError::Transport(Error::Transport(_))));
    }
}
