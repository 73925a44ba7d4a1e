//! Search client error types.

use go2web_core::Error;

/// Errors from the HTML search client.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Empty or oversized query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Configured endpoint is not an absolute http(s) URL.
    #[error("invalid search endpoint: {0}")]
    InvalidEndpoint(String),

    /// Final response status was not 200.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Redirect without a usable `Location`.
    #[error("bad redirect: {0}")]
    BadRedirect(String),

    /// Connect, timeout or protocol failure underneath.
    #[error(transparent)]
    Transport(#[from] Error),
}

impl From<SearchError> for Error {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidQuery(msg) => Error::InvalidInput(msg),
            SearchError::InvalidEndpoint(msg) => Error::InvalidUrl(msg),
            SearchError::Transport(inner) => inner,
            other => Error::SearchFailed(other.to_string()),
        }
    }
}
