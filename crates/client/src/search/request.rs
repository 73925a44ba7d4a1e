//! Search request types and validation.

use url::form_urlencoded;

use super::SearchError;

/// Maximum query length in characters.
pub const MAX_QUERY_CHARS: usize = 400;

/// A search query as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Terms, joined with single spaces to form the query.
    pub terms: Vec<String>,

    /// Region code sent as `kl` (default `us-en`).
    pub region: String,
}

impl SearchRequest {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { terms: terms.into_iter().map(Into::into).collect(), region: "us-en".to_string() }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// The query string: terms trimmed and joined by single spaces.
    pub fn query(&self) -> String {
        self.terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Validate the query.
    pub fn validate(&self) -> Result<(), SearchError> {
        let query = self.query();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery("query cannot be empty".to_string()));
        }

        let chars = query.chars().count();
        if chars > MAX_QUERY_CHARS {
            return Err(SearchError::InvalidQuery(format!("query too long: {chars} chars (max {MAX_QUERY_CHARS})")));
        }

        Ok(())
    }

    /// `application/x-www-form-urlencoded` body for the search form.
    pub fn form_body(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("q", &self.query())
            .append_pair("kl", &self.region)
            .append_pair("dt", "t")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_joins_terms() {
        let req = SearchRequest::new(["rust", " async ", "", "io"]);
        assert_eq!(req.query(), "rust async io");
    }

    #[test]
    fn test_validate_empty() {
        let req = SearchRequest::new(["  ", ""]);
        assert!(matches!(req.validate(), Err(SearchError::InvalidQuery(_))));
        assert!(SearchRequest::new(Vec::<String>::new()).validate().is_err());
    }

    #[test]
    fn test_validate_too_long() {
        let req = SearchRequest::new(["a".repeat(401)]);
        assert!(matches!(req.validate(), Err(SearchError::InvalidQuery(msg)) if msg.contains("401")));
        assert!(SearchRequest::new(["a".repeat(400)]).validate().is_ok());
    }

    #[test]
    fn test_form_body_encoding() {
        let req = SearchRequest::new(["c++", "& rust?"]);
        assert_eq!(req.form_body(), "q=c%2B%2B+%26+rust%3F&kl=us-en&dt=t");
    }

    #[test]
    fn test_region_override() {
        let req = SearchRequest::new(["x"]).with_region("de-de");
        assert!(req.form_body().contains("kl=de-de"));
    }
}
