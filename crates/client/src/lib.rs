//! Client code for go2web.
//!
//! This crate provides the raw HTTP/1.1 client, the cache-aware fetch
//! pipeline, content processing and the HTML search client used by the CLI.

pub mod extract;
pub mod fetch;
pub mod http;
pub mod search;

pub use extract::{ContentProcessor, DefaultProcessor, extract_readable};
pub use fetch::{FetchClient, FetchConfig, FetchOutcome, FetchSource};
pub use http::{HttpClient, HttpConfig, HttpRequest, HttpResponse, HttpTransport};
pub use search::{SearchClient, SearchConfig, SearchError, SearchRequest, SearchResult};
