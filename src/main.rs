use clap::Parser;
use review_indexer::app::App;
use review_indexer::cli::{Args, Command, prompt_url};
use review_indexer::config::Config;
use review_indexer::logging::setup_logging;
use std::process::ExitCode;
use tracing::{error, info};
use yansi::Paint;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Credentials are checked before anything else starts.
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e}", "configuration error:".red().bold());
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config.log_level, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        "starting review-indexer"
    );

    match run(config, args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "fatal error");
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Scrape { url } => {
            // Prompt before connecting anywhere so the question isn't buried in logs.
            let url = match url {
                Some(url) => url,
                None => tokio::task::spawn_blocking(prompt_url).await??,
            };
            let app = App::new(config).await?;
            let summary = app.scrape(&url).await?;

            println!(
                "{} {} ({})",
                "Indexed".green().bold(),
                summary.name.bold(),
                summary.subject
            );
            println!("  reviews found:    {}", summary.reviews_found);
            println!("  reviews embedded: {}", summary.reviews_embedded);
            println!("  records written:  {}", summary.records_written);
            println!("{}", "Done.".green());
        }
        Command::Ask { question } => {
            let app = App::new(config).await?;
            let answer = app.ask(&question).await?;
            println!("{answer}");
        }
    }

    Ok(())
}
