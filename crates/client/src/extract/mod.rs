//! Turning raw response bodies into displayable text.
//!
//! ### Dispatch on media type
//! - JSON (`application/json`, `text/json`, `*+json`) → pretty-printed
//! - `text/plain` → as-is
//! - anything else → readable text extracted from HTML
//!
//! Processing never fails; undecodable input degrades to lossy UTF-8 text.

pub mod readable;

pub use readable::extract_readable;

/// Converts a response body into the text shown to the user and cached.
pub trait ContentProcessor: Send + Sync {
    fn process(&self, body: &[u8], content_type: &str) -> String;
}

/// JSON pretty-printing, plain-text pass-through and HTML readable text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProcessor;

impl ContentProcessor for DefaultProcessor {
    fn process(&self, body: &[u8], content_type: &str) -> String {
        let media_type = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

        if is_json(&media_type) {
            return pretty_json(body);
        }

        let text = String::from_utf8_lossy(body);
        if media_type == "text/plain" {
            return text.into_owned();
        }

        extract_readable(&text)
    }
}

/// Whether `media_type` names a JSON document.
pub fn is_json(media_type: &str) -> bool {
    media_type == "application/json" || media_type == "text/json" || media_type.ends_with("+json")
}

fn pretty_json(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned()),
        Err(e) => {
            tracing::debug!(error = %e, "body labelled JSON does not parse; returning text");
            String::from_utf8_lossy(body).into_owned()
        }
    }
}
