//! Search result listing and interactive selection.

use go2web_client::SearchResult;

/// A reply to the selection prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Exit,
    /// Zero-based index into the result list.
    Pick(usize),
    Invalid,
}

/// Interpret a line typed at the prompt for a list of `count` results.
pub fn parse_selection(input: &str, count: usize) -> Selection {
    match input.trim().parse::<usize>() {
        Ok(0) => Selection::Exit,
        Ok(n) if n <= count => Selection::Pick(n - 1),
        _ => Selection::Invalid,
    }
}

/// Numbered listing shown before the prompt.
pub fn render_results(query: &str, results: &[SearchResult]) -> String {
    let mut out = format!("Top {} search results for: {query}\n", results.len());
    for result in results {
        out.push_str(&format!("{}. {}\n   {}\n", result.rank, result.title, result.url));
    }
    out
}

pub fn prompt(count: usize) -> String {
    format!("Enter a number (1-{count}) to fetch that URL, or 0 to exit: ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(rank: usize, url: &str) -> SearchResult {
        SearchResult { rank, title: format!("Title {rank}"), url: url.to_string() }
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("0\n", 3), Selection::Exit);
        assert_eq!(parse_selection(" 1 ", 3), Selection::Pick(0));
        assert_eq!(parse_selection("3", 3), Selection::Pick(2));
        assert_eq!(parse_selection("4", 3), Selection::Invalid);
        assert_eq!(parse_selection("two", 3), Selection::Invalid);
        assert_eq!(parse_selection("", 3), Selection::Invalid);
        assert_eq!(parse_selection("-1", 3), Selection::Invalid);
    }

    #[test]
    fn test_render_results() {
        let results = vec![result(1, "https://a.test/"), result(2, "https://b.test/")];
        let out = render_results("rust", &results);
        assert!(out.starts_with("Top 2 search results for: rust\n"));
        assert!(out.contains("1. Title 1\n   https://a.test/\n"));
        assert!(out.contains("2. Title 2\n   https://b.test/\n"));
    }

    #[test]
    fn test_prompt_names_range() {
        assert_eq!(prompt(7), "Enter a number (1-7) to fetch that URL, or 0 to exit: ");
    }
}
