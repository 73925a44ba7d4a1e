//! Request model and HTTP/1.1 wire serialization.

use std::fmt;

use bytes::Bytes;
use url::Url;

use super::Headers;

/// Request methods the client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single HTTP request: method, absolute URL, headers and optional body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self { method: Method::Get, url, headers: Headers::new(), body: None }
    }

    pub fn post(url: Url, body: impl Into<Bytes>) -> Self {
        Self { method: Method::Post, url, headers: Headers::new(), body: Some(body.into()) }
    }

    /// Builder-style header override.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Request target in origin form: `path[?query]`, `/` when the path is empty.
    pub fn target(&self) -> String {
        let path = match self.url.path() {
            "" => "/",
            path => path,
        };
        match self.url.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }

    /// `Host` header value; the port is only included when it is not the scheme default.
    pub fn host_header(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Serialize to wire bytes with the given default headers underneath
    /// this request's own.
    ///
    /// `Host` and `Content-Length` are always computed here; configured
    /// values for either are ignored.
    pub fn to_bytes(&self, defaults: &Headers) -> Vec<u8> {
        let headers = defaults.merged_with(&self.headers);

        let mut head = format!("{} {} HTTP/1.1\r\nHost: {}\r\n", self.method, self.target(), self.host_header());
        for (name, value) in headers.iter() {
            if name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        if let Some(body) = &self.body {
            head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        head.push_str("\r\n");

        let mut wire = head.into_bytes();
        if let Some(body) = &self.body {
            wire.extend_from_slice(body);
        }
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(request: &HttpRequest, defaults: &Headers) -> String {
        String::from_utf8(request.to_bytes(defaults)).unwrap()
    }

    #[test]
    fn test_get_request_line_and_host() {
        let req = HttpRequest::get(Url::parse("http://example.com/a/b?x=1&y=2").unwrap());
        let text = wire(&req, &Headers::new());
        assert!(text.starts_with("GET /a/b?x=1&y=2 HTTP/1.1\r\nHost: example.com\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
        assert!(!text.contains("Content-Length"));
    }

    #[test]
    fn test_root_target() {
        let req = HttpRequest::get(Url::parse("https://example.com").unwrap());
        assert_eq!(req.target(), "/");
    }

    #[test]
    fn test_non_default_port_in_host() {
        let req = HttpRequest::get(Url::parse("http://127.0.0.1:8080/").unwrap());
        assert_eq!(req.host_header(), "127.0.0.1:8080");

        let req = HttpRequest::get(Url::parse("https://example.com:443/").unwrap());
        assert_eq!(req.host_header(), "example.com");
    }

    #[test]
    fn test_post_body_and_length() {
        let req = HttpRequest::post(Url::parse("https://example.com/html/").unwrap(), "q=rust")
            .with_header("Content-Type", "application/x-www-form-urlencoded");
        let text = wire(&req, &Headers::new());
        assert!(text.starts_with("POST /html/ HTTP/1.1\r\n"));
        assert!(text.contains("Content-Type: application/x-www-form-urlencoded\r\n"));
        assert!(text.contains("Content-Length: 6\r\n"));
        assert!(text.ends_with("\r\n\r\nq=rust"));
    }

    #[test]
    fn test_request_headers_override_defaults() {
        let defaults: Headers = [("User-Agent", "default-agent"), ("Connection", "close")].into_iter().collect();
        let req = HttpRequest::get(Url::parse("http://example.com/").unwrap()).with_header("user-agent", "custom");
        let text = wire(&req, &defaults);
        assert!(text.contains("user-agent: custom\r\n"));
        assert!(!text.contains("default-agent"));
        assert!(text.contains("Connection: close\r\n"));
    }

    #[test]
    fn test_configured_host_and_length_ignored() {
        let req = HttpRequest::get(Url::parse("http://example.com/").unwrap())
            .with_header("Host", "evil.test")
            .with_header("Content-Length", "99");
        let text = wire(&req, &Headers::new());
        assert_eq!(text.matches("Host:").count(), 1);
        assert!(!text.contains("evil.test"));
        assert!(!text.contains("Content-Length"));
    }
}
