//! Command-line arguments.

use clap::Parser;

/// Fetch web pages and search the web from the terminal.
#[derive(Debug, Parser)]
#[command(name = "go2web")]
#[command(about = "Fetch web pages and search the web from the terminal")]
#[command(after_help = r#"Examples:
  go2web -u https://example.com      # Fetch a page as readable text
  go2web -u api.github.com/zen       # Scheme defaults to https
  go2web -s rust async io            # Search and pick a result to open"#)]
pub struct Cli {
    /// Make an HTTP request to URL and print the response.
    #[arg(short = 'u', long = "url", value_name = "URL", conflicts_with = "search")]
    pub url: Option<String>,

    /// Search the term(s) and print the top results.
    #[arg(short = 's', long = "search", value_name = "TERM", num_args = 1..)]
    pub search: Option<Vec<String>>,

    /// Accept any TLS certificate.
    #[arg(long)]
    pub insecure: bool,
}

/// What a parsed command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Fetch(String),
    Search(Vec<String>),
}

impl Cli {
    /// `None` when neither `-u` nor `-s` was given.
    pub fn action(&self) -> Option<Action> {
        if let Some(url) = &self.url {
            return Some(Action::Fetch(url.clone()));
        }
        self.search.as_ref().map(|terms| Action::Search(terms.clone()))
    }
}
