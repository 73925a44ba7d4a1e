//! Hand-rolled HTTP/1.1 client.
//!
//! One connection per request with `Connection: close`. Requests are
//! serialized by [`HttpRequest::to_bytes`], responses parsed by
//! [`ResponseParser`] with chunked, length-delimited and read-to-close
//! framing. The [`HttpTransport`] trait is the seam the fetch pipeline and
//! search client are written against.

mod client;
pub mod headers;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{HttpClient, HttpConfig, HttpTransport};
pub use headers::Headers;
pub use request::{HttpRequest, Method};
pub use response::{HttpResponse, ParseOptions, ResponseParser};
pub use transport::{Connection, Scheme, TransportConnector};
