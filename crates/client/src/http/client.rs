use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use go2web_core::{AppConfig, Error};
use tokio::io::{AsyncWriteExt, BufReader};

use super::response::{ParseOptions, ResponseParser};
use super::transport::{Scheme, TransportConnector};
use super::{Headers, HttpRequest, HttpResponse};

/// Settings for the raw HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub insecure_tls: bool,
    pub max_malformed_chunk_lines: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for HttpConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            accept: config.accept.clone(),
            accept_language: config.accept_language.clone(),
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            insecure_tls: config.insecure_tls,
            max_malformed_chunk_lines: config.max_malformed_chunk_lines,
        }
    }
}

/// Sends one request and returns one parsed response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error>;
}

/// HTTP/1.1 client speaking directly over TCP or TLS, one connection per request.
#[derive(Debug, Clone)]
pub struct HttpClient {
    connector: TransportConnector,
    default_headers: Headers,
    parse_options: ParseOptions,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, Error> {
        let connector = TransportConnector::new(config.connect_timeout, config.insecure_tls)?;

        let mut default_headers = Headers::new();
        default_headers.set("User-Agent", config.user_agent.as_str());
        default_headers.set("Accept", config.accept.as_str());
        default_headers.set("Accept-Language", config.accept_language.as_str());
        default_headers.set("Connection", "close");

        let parse_options = ParseOptions {
            read_timeout: config.read_timeout,
            max_malformed_chunk_lines: config.max_malformed_chunk_lines,
        };

        Ok(Self { connector, default_headers, parse_options })
    }

    /// Wrap in an `Arc` for use as a shared [`HttpTransport`].
    pub fn shared(self) -> Arc<dyn HttpTransport> {
        Arc::new(self)
    }

    /// Open a connection, write the request and parse the response.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let scheme = Scheme::from_url(&request.url)?;
        let host = request
            .url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(format!("missing host: {}", request.url)))?;
        let port = request.url.port().unwrap_or_else(|| scheme.default_port());

        let mut conn = self.connector.connect(host, port, scheme).await?;

        let wire = request.to_bytes(&self.default_headers);
        let write = async {
            conn.write_all(&wire).await?;
            conn.flush().await
        };
        match tokio::time::timeout(self.parse_options.read_timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(Error::Transport(format!("write to {host}:{port} failed: {e}"))),
            Err(_) => return Err(Error::Timeout(format!("write to {host}:{port} timed out"))),
        }

        tracing::debug!(method = %request.method, url = %request.url, "request sent");

        let response = ResponseParser::new(BufReader::new(conn), self.parse_options).parse().await?;
        tracing::debug!(status = response.status, bytes = response.body.len(), "response received");
        Ok(response)
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        self.execute(request).await
    }
}
