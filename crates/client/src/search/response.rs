//! Result scraping from the HTML search page.

use std::collections::HashSet;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// 1-based position in the presented list.
    pub rank: usize,
    pub title: String,
    /// Absolute target URL.
    pub url: String,
}

/// Extract up to `limit` results from a search results page.
///
/// Result anchors are resolved against `base`; redirect-wrapped links are
/// unwrapped to their target and the engine's own links are dropped.
pub fn parse_results(html: &str, base: &Url, limit: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a.result__a, a.result__url").expect("invalid selector");

    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for element in document.select(&selector) {
        if results.len() >= limit {
            break;
        }

        let Some(href) = element.value().attr("href") else { continue };
        let Some(target) = result_target(base, href) else {
            tracing::debug!(href, "skipping non-result link");
            continue;
        };

        let url = target.to_string();
        if !seen.insert(url.clone()) {
            continue;
        }

        let title = element.text().collect::<Vec<_>>().join(" ");
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        let title = if title.is_empty() { url.clone() } else { title };

        results.push(SearchResult { rank: results.len() + 1, title, url });
    }

    results
}

/// Absolute destination of a result link, or `None` for engine-internal links.
fn result_target(base: &Url, href: &str) -> Option<Url> {
    let resolved = base.join(href.trim()).ok()?;

    let target = if is_engine_host(&resolved) {
        if !resolved.path().starts_with("/l/") {
            return None;
        }
        let (_, wrapped) = resolved.query_pairs().find(|(k, _)| k == "uddg")?;
        Url::parse(&wrapped).ok()?
    } else {
        resolved
    };

    matches!(target.scheme(), "http" | "https").then_some(target)
}

fn is_engine_host(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"))
}
