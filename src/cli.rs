use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use url::Url;

/// Scrape professor reviews into a vector index, and ask questions about them.
#[derive(Parser, Debug)]
#[command(name = "review-indexer", version)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty, global = true)]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a professor page, embed its reviews and upsert them
    Scrape {
        /// Professor page URL (prompted for when omitted)
        #[arg(value_parser = parse_url)]
        url: Option<Url>,
    },
    /// Answer a question using the most similar indexed reviews
    Ask {
        question: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    Pretty,
    Json,
}

/// Ask the operator for a professor URL on stdin.
pub fn prompt_url() -> anyhow::Result<Url> {
    let mut stdout = io::stdout();
    write!(stdout, "Enter the professor's link: ")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    parse_url(&line)
}

fn parse_url(input: &str) -> anyhow::Result<Url> {
    let input = input.trim();
    anyhow::ensure!(!input.is_empty(), "no URL given");
    let url = Url::parse(input).map_err(|e| anyhow::anyhow!("invalid URL {input:?}: {e}"))?;
    anyhow::ensure!(
        matches!(url.scheme(), "http" | "https"),
        "unsupported URL scheme {:?}",
        url.scheme()
    );
    Ok(url)
}
