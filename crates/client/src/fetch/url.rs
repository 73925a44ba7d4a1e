//! URL canonicalization and redirect target resolution.

use go2web_core::Error;
use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("missing host in {0}")]
    MissingHost(String),

    #[error("invalid URL: {0}")]
    Invalid(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize user input into the URL used as the cache key.
///
/// 1. Trim surrounding whitespace
/// 2. Default the scheme to `https://` when none is given
/// 3. Accept only `http` and `https`
/// 4. Lowercase the host (done by the URL parser) and drop the fragment
///
/// The query string is kept as written.
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let with_scheme = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
    let parsed = Url::parse(&with_scheme).map_err(|e| UrlError::Invalid(format!("{trimmed}: {e}")))?;
    web_url(parsed)
}

/// Resolve a `Location` value against the URL that produced the redirect.
pub fn resolve_redirect(current: &Url, location: &str) -> Result<Url, UrlError> {
    let joined = current
        .join(location.trim())
        .map_err(|e| UrlError::Invalid(format!("redirect target {location}: {e}")))?;
    web_url(joined)
}

fn web_url(mut url: Url) -> Result<Url, UrlError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::MissingHost(url.to_string()));
    }
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scheme_and_root_path() {
        let url = canonicalize("example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_lowercase_host_and_drop_fragment() {
        let url = canonicalize("  HTTP://EXAMPLE.com/Path?b=2&a=1#top ").unwrap();
        assert_eq!(url.as_str(), "http://example.com/Path?b=2&a=1");
    }

    #[test]
    fn test_rejects_empty_and_foreign_schemes() {
        assert_eq!(canonicalize("  "), Err(UrlError::Empty));
        assert!(matches!(canonicalize("ftp://example.com/x"), Err(UrlError::UnsupportedScheme(s)) if s == "ftp"));
        assert!(matches!(canonicalize("file:///etc/hosts"), Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(canonicalize("http://exa mple.com"), Err(UrlError::Invalid(_))));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let base = Url::parse("https://example.com/a/b").unwrap();
        assert_eq!(resolve_redirect(&base, "/c").unwrap().as_str(), "https://example.com/c");
        assert_eq!(resolve_redirect(&base, "d?x=1").unwrap().as_str(), "https://example.com/a/d?x=1");
        assert_eq!(
            resolve_redirect(&base, "http://other.test/#frag").unwrap().as_str(),
            "http://other.test/"
        );
        assert_eq!(resolve_redirect(&base, "//cdn.test/x").unwrap().as_str(), "https://cdn.test/x");
    }

    #[test]
    fn test_redirect_to_other_scheme_rejected() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(matches!(
            resolve_redirect(&base, "javascript:alert(1)"),
            Err(UrlError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_converts_to_invalid_url_error() {
        let err: Error = UrlError::Empty.into();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
