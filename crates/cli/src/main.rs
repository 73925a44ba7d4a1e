//! go2web command-line entry point.
//!
//! Content goes to stdout; logs, notes and errors go to stderr.

use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use go2web_client::{FetchClient, FetchConfig, FetchSource, HttpConfig, SearchClient, SearchConfig, SearchRequest};
use go2web_core::{AppConfig, CacheStore, Error};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod args;
mod select;

use args::{Action, Cli};
use select::Selection;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err.downcast_ref::<Error>().map(Error::exit_code).unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Some(action) = cli.action() else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut config = AppConfig::load().map_err(Error::from)?;
    if cli.insecure {
        config.insecure_tls = true;
    }

    let mut cache = CacheStore::new(&config.cache_path);
    cache.load().await;

    let fetcher = FetchClient::new(FetchConfig::from(&config))?;

    match action {
        Action::Fetch(url) => fetch(&fetcher, &mut cache, &url).await,
        Action::Search(terms) => search(&config, &fetcher, &mut cache, terms).await,
    }
}

async fn fetch(fetcher: &FetchClient, cache: &mut CacheStore, url: &str) -> Result<()> {
    let outcome = fetcher.fetch(cache, url).await?;

    match outcome.source {
        FetchSource::Cache => eprintln!("(served from cache: {})", outcome.final_url),
        FetchSource::Revalidated => eprintln!("(not modified; served from cache: {})", outcome.final_url),
        FetchSource::Network if outcome.redirects > 0 => {
            eprintln!("(redirected {} time(s) to {})", outcome.redirects, outcome.final_url)
        }
        FetchSource::Network => {}
    }

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", outcome.content)?;
    stdout.flush()?;
    Ok(())
}

async fn search(config: &AppConfig, fetcher: &FetchClient, cache: &mut CacheStore, terms: Vec<String>) -> Result<()> {
    let client = SearchClient::from_config(&HttpConfig::from(config), SearchConfig::from(config)).map_err(Error::from)?;
    let request = SearchRequest::new(terms);
    let results = client.search(&request).await.map_err(Error::from)?;

    if results.is_empty() {
        println!("No results found for: {}", request.query());
        return Ok(());
    }

    print!("{}\n{}", select::render_results(&request.query(), &results), select::prompt(results.len()));
    std::io::stdout().flush()?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

    match select::parse_selection(&line, results.len()) {
        Selection::Exit => Ok(()),
        Selection::Pick(index) => {
            let target = &results[index].url;
            eprintln!("Fetching {target}");
            fetch(fetcher, cache, target).await
        }
        Selection::Invalid => {
            eprintln!("Invalid selection: {}", line.trim());
            Ok(())
        }
    }
}
