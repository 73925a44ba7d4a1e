//! Unified error types for go2web.
//!
//! Every variant renders with a stable `CODE:` prefix so failures stay
//! greppable in logs, and maps to a process exit code for the CLI.

use tokio_rusqlite::rusqlite;

/// Unified error types for go2web.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty search query).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// URL could not be parsed, uses an unsupported scheme, or a redirect target is unusable.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// DNS, connect, socket or TLS failure.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(String),

    /// Connect or read exceeded its bound.
    #[error("TIMEOUT: {0}")]
    Timeout(String),

    /// The peer spoke something that is not usable HTTP/1.x.
    #[error("PROTOCOL_ERROR: {0}")]
    Protocol(String),

    /// Redirect chain exceeded the configured hop limit.
    #[error("REDIRECT_LOOP: more than {max} redirects (last target {url})")]
    RedirectLoop { max: usize, url: String },

    /// Search endpoint refused or failed the query.
    #[error("SEARCH_FAILED: {0}")]
    SearchFailed(String),

    /// Cache file could not be read, moved or written.
    #[error("CACHE_IO: {0}")]
    CacheIo(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Process exit code reported by the CLI for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidInput(_) | Error::InvalidUrl(_) => 2,
            Error::Transport(_) => 3,
            Error::Timeout(_) => 4,
            Error::Protocol(_) => 5,
            Error::RedirectLoop { .. } => 6,
            Error::SearchFailed(_) => 7,
            Error::CacheIo(_) | Error::Database(_) | Error::MigrationFailed(_) => 8,
        }
    }

    /// Whether SQLite rejected the file itself as not a database or corrupt.
    pub fn is_corrupt_database(&self) -> bool {
        let Error::Database(tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(failure, _))) = self else {
            return false;
        };
        matches!(failure.code, rusqlite::ErrorCode::NotADatabase | rusqlite::ErrorCode::DatabaseCorrupt)
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
