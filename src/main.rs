//! trialfinder - Search the ClinicalTrials.gov registry from the command line
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::error::Error;

use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use trialfinder::cli::{Cli, Command};
use trialfinder::config::ServiceConfig;
use trialfinder::data::SearchRequest;
use trialfinder::logging;
use trialfinder::service::TrialService;

#[derive(Serialize)]
struct ErrorLine {
    error: String,
}

/// Prints a value as pretty JSON on stdout
fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Answers newline-delimited search requests from stdin
///
/// A bad line produces an error line and processing continues.
async fn run_batch(service: &TrialService) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let output = match serde_json::from_str::<SearchRequest>(line) {
            Ok(request) => match service.search(&request).await {
                Ok(response) => serde_json::to_string(&response)?,
                Err(e) => {
                    warn!(error = %e, "Batch search failed");
                    serde_json::to_string(&ErrorLine {
                        error: e.to_string(),
                    })?
                }
            },
            Err(e) => serde_json::to_string(&ErrorLine {
                error: format!("Invalid request: {}", e),
            })?,
        };
        println!("{}", output);
    }

    Ok(())
}

async fn run(command: &Command, service: &TrialService) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Search(args) => {
            let request = args.to_request()?;
            let response = service.search(&request).await?;
            print_json(&response)
        }
        Command::Trial { nct_id } => {
            let trial = service.get_trial(nct_id).await?;
            print_json(&trial)
        }
        Command::Batch => run_batch(service).await,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);

    let config = ServiceConfig::from_cli(&cli);
    let service = TrialService::new(&config)?;
    let sweeper = service.spawn_cache_sweeper();

    let result = run(&cli.command, &service).await;

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }

    result
}
