//! Response model and the HTTP/1.1 response parser.
//!
//! ### Parser states
//! `ReadStatusLine → ReadHeaders → DetermineFraming → ReadBody → Done`
//!
//! Interim 1xx heads are read and discarded until the final status line.
//!
//! ### Body framing
//! - 204 and 304 carry no body
//! - `Transfer-Encoding: chunked` → chunked decoding (byte-exact, trailers discarded)
//! - `Content-Length: N` → at most N bytes; a short body at EOF is accepted
//! - otherwise → read until the peer closes
//!
//! Malformed chunk-size lines are skipped rather than failing the response,
//! up to [`ParseOptions::max_malformed_chunk_lines`] per body.

use std::future::Future;
use std::io;
use std::sync::LazyLock;
use std::time::Duration;

use bytes::Bytes;
use go2web_core::Error;
use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::Headers;

static STATUS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^HTTP/\d\.\d (\d{3})(?: (.*))?$").expect("invalid status line regex"));

/// Interim (1xx) responses tolerated before the final one.
const MAX_INTERIM_RESPONSES: usize = 8;

/// A parsed HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub message: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, message: impl Into<String>, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self { status, message: message.into(), headers, body: body.into() }
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Media type without parameters (`text/html; charset=utf-8` → `text/html`).
    pub fn media_type(&self) -> Option<String> {
        self.header("Content-Type")
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Limits applied while reading a response.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Bound on every individual read from the peer.
    pub read_timeout: Duration,
    /// Malformed or blank chunk-size lines tolerated per body.
    pub max_malformed_chunk_lines: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { read_timeout: Duration::from_secs(10), max_malformed_chunk_lines: 16 }
    }
}

/// How the body of a response is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Empty,
    Chunked,
    Length(u64),
    UntilEof,
}

impl Framing {
    fn determine(status: u16, headers: &Headers) -> Self {
        if (100..200).contains(&status) || status == 204 || status == 304 {
            return Framing::Empty;
        }

        let chunked = headers
            .get_all("Transfer-Encoding")
            .any(|v| v.to_ascii_lowercase().contains("chunked"));
        if chunked {
            return Framing::Chunked;
        }

        if let Some(value) = headers.get("Content-Length") {
            match value.trim().parse::<u64>() {
                Ok(length) => return Framing::Length(length),
                Err(_) => tracing::warn!(value, "unparsable Content-Length; reading until close"),
            }
        }

        Framing::UntilEof
    }
}

/// Reads one response from a buffered byte stream.
pub struct ResponseParser<R> {
    reader: R,
    options: ParseOptions,
}

impl<R: AsyncBufRead + Unpin> ResponseParser<R> {
    pub fn new(reader: R, options: ParseOptions) -> Self {
        Self { reader, options }
    }

    /// Parse status line, headers and body of the final response.
    pub async fn parse(mut self) -> Result<HttpResponse, Error> {
        let mut interim = 0usize;
        let (status, message, headers) = loop {
            let (status, message) = self.read_status_line().await?;
            let headers = self.read_headers().await?;
            if !(100..200).contains(&status) {
                break (status, message, headers);
            }

            interim += 1;
            if interim > MAX_INTERIM_RESPONSES {
                return Err(Error::Protocol(format!("more than {MAX_INTERIM_RESPONSES} interim responses")));
            }
            tracing::debug!(status, "discarding interim response");
        };

        let framing = Framing::determine(status, &headers);
        tracing::debug!(status, ?framing, "parsed response head");

        let body = match framing {
            Framing::Empty => Vec::new(),
            Framing::Chunked => self.read_chunked().await?,
            Framing::Length(length) => self.read_length(length).await?,
            Framing::UntilEof => self.read_to_eof().await?,
        };

        Ok(HttpResponse { status, message, headers, body: Bytes::from(body) })
    }

    async fn read_status_line(&mut self) -> Result<(u16, String), Error> {
        let line = self
            .read_line()
            .await?
            .ok_or_else(|| Error::Protocol("empty response".into()))?;

        let captures = STATUS_LINE
            .captures(&line)
            .ok_or_else(|| Error::Protocol(format!("invalid status line: {line}")))?;
        let status = captures[1]
            .parse::<u16>()
            .map_err(|_| Error::Protocol(format!("invalid status code: {line}")))?;
        let message = captures.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default();

        Ok((status, message))
    }

    async fn read_headers(&mut self) -> Result<Headers, Error> {
        let mut headers = Headers::new();
        while let Some(line) = self.read_line().await? {
            if line.is_empty() {
                break;
            }
            match line.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => headers.append(name.trim(), value.trim()),
                _ => tracing::debug!(line = %line, "ignoring header line without a name"),
            }
        }
        Ok(headers)
    }

    async fn read_chunked(&mut self) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        let mut skipped = 0usize;

        loop {
            let Some(line) = self.read_line().await? else {
                tracing::debug!("connection closed before terminating chunk");
                return Ok(body);
            };

            let size = match chunk_size(&line) {
                Some(size) => size,
                None => {
                    skipped += 1;
                    if skipped > self.options.max_malformed_chunk_lines {
                        return Err(Error::Protocol(format!(
                            "more than {} malformed chunk-size lines",
                            self.options.max_malformed_chunk_lines
                        )));
                    }
                    tracing::debug!(line = %line, skipped, "skipping malformed chunk-size line");
                    continue;
                }
            };

            if size == 0 {
                self.skip_trailers().await?;
                return Ok(body);
            }

            let read = self.read_exact_or_eof(size, &mut body).await?;
            if read < size {
                tracing::debug!(expected = size, read, "connection closed inside chunk");
                return Ok(body);
            }

            // CRLF closing the chunk payload
            if self.read_line().await?.is_none() {
                return Ok(body);
            }
        }
    }

    async fn skip_trailers(&mut self) -> Result<(), Error> {
        while let Some(line) = self.read_line().await? {
            if line.is_empty() {
                break;
            }
            tracing::debug!(line = %line, "discarding trailer");
        }
        Ok(())
    }

    async fn read_length(&mut self, length: u64) -> Result<Vec<u8>, Error> {
        let mut body = Vec::with_capacity(length.min(1 << 20) as usize);
        let read = self.read_exact_or_eof(length, &mut body).await?;
        if read < length {
            tracing::debug!(expected = length, read, "short body accepted");
        }
        Ok(body)
    }

    async fn read_to_eof(&mut self) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = with_timeout(self.options.read_timeout, self.reader.read(&mut buf)).await?;
            if n == 0 {
                return Ok(body);
            }
            body.extend_from_slice(&buf[..n]);
        }
    }

    /// Append up to `count` bytes to `out`, stopping early at EOF.
    async fn read_exact_or_eof(&mut self, count: u64, out: &mut Vec<u8>) -> Result<u64, Error> {
        let mut remaining = count;
        let mut buf = [0u8; 8192];
        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let n = with_timeout(self.options.read_timeout, self.reader.read(&mut buf[..want])).await?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
            remaining -= n as u64;
        }
        Ok(count - remaining)
    }

    /// Next line without its line terminator; `None` at EOF.
    async fn read_line(&mut self) -> Result<Option<String>, Error> {
        let mut raw = Vec::new();
        let n = with_timeout(self.options.read_timeout, self.reader.read_until(b'\n', &mut raw)).await?;
        if n == 0 {
            return Ok(None);
        }
        while matches!(raw.last(), Some(b'\n' | b'\r')) {
            raw.pop();
        }
        Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
    }
}

/// Leading hex digits of a chunk-size line, ignoring extensions.
///
/// `None` when the line has no leading hex digit or the value overflows.
fn chunk_size(line: &str) -> Option<u64> {
    let trimmed = line.trim();
    let end = trimmed
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(trimmed.len());
    if end == 0 {
        return None;
    }
    u64::from_str_radix(&trimmed[..end], 16).ok()
}

/// Run one read under `limit`, mapping elapsed time and I/O failures onto [`Error`].
async fn with_timeout<T>(limit: Duration, op: impl Future<Output = io::Result<T>>) -> Result<T, Error> {
    match tokio::time::timeout(limit, op).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => {
            Err(Error::Timeout(format!("read timed out: {e}")))
        }
        Ok(Err(e)) => Err(Error::Transport(format!("read failed: {e}"))),
        Err(_) => Err(Error::Timeout(format!("no data within {}ms", limit.as_millis()))),
    }
}
