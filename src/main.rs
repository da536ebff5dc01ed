mod cli;
mod config;
mod dataflow;

use anyhow::Context;
use log::{info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use std::process::ExitCode;

use crate::cli::Cli;
use crate::config::Config;
use crate::dataflow::connectors::pokemontcg::PokemonTcgClient;
use crate::dataflow::paginator::Paginator;
use crate::dataflow::projection::{project, Card};
use crate::dataflow::sinks::{write_csv, write_json, CsvOutcome};
use crate::dataflow::{FetchError, PageSource};

/// Exit status when a transport error cut the fetch short
const EXIT_PARTIAL: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Complete,
    Partial,
}

impl RunStatus {
    fn exit_status(self) -> u8 {
        match self {
            RunStatus::Complete => 0,
            RunStatus::Partial => EXIT_PARTIAL,
        }
    }
}

/// What a fetch-and-save pass produced
struct Report {
    status: RunStatus,
    cards: Vec<Card>,
    cause: Option<FetchError>,
    persisted: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let mut cli = Cli::new();

    if let Err(err) = SimpleLogger::new()
        .with_level(cli.args.log_level())
        .with_module_level("hyper", LevelFilter::Warn)
        .with_module_level("reqwest", LevelFilter::Warn)
        .init()
    {
        cli.report_error(&err).ok();
        return ExitCode::FAILURE;
    }

    match run(&mut cli).await {
        Ok(status) => ExitCode::from(status.exit_status()),
        Err(err) => {
            cli.report_error(&format!("{:#}", err)).ok();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &mut Cli) -> anyhow::Result<RunStatus> {
    let config = Config::from_args(&cli.args)?;

    info!(
        "Fetching cards from {} ({} per page, limit: {:?})",
        config.base_url, config.page_size, config.max_records
    );

    let client = PokemonTcgClient::new(&config.base_url, config.request_timeout)?;
    let report = execute(&config, client).await?;

    if let Some(cause) = &report.cause {
        cli.report_partial(report.cards.len(), cause, report.persisted)?;
    }

    if report.persisted {
        cli.print_summary(&report.cards, config.sample_size)?;
    }

    Ok(report.status)
}

/// Fetches every page from `source`, then saves the cards unless the fetch
/// was cut short and `keep_partial` is off.
async fn execute<S: PageSource>(config: &Config, source: S) -> anyhow::Result<Report> {
    let paginator = Paginator::new(source, config.page_size, config.inter_page_delay);

    let outcome = paginator.fetch_all(config.max_records).await;
    let status = if outcome.is_complete() {
        RunStatus::Complete
    } else {
        RunStatus::Partial
    };
    let (records, cause) = outcome.into_parts();
    let cards = project(&records);

    let persisted = match &cause {
        Some(_) if !config.keep_partial => {
            warn!("Discarding {} cards from an incomplete fetch", cards.len());
            false
        }
        _ => {
            if cause.is_some() {
                warn!("Writing {} cards from an incomplete fetch", cards.len());
            }

            persist(&cards, config)?;
            true
        }
    };

    Ok(Report {
        status,
        cards,
        cause,
        persisted,
    })
}

fn persist(cards: &[Card], config: &Config) -> anyhow::Result<()> {
    write_json(cards, &config.json_output_path)
        .with_context(|| format!("saving {}", config.json_output_path.display()))?;
    info!("Saved {} cards to {}", cards.len(), config.json_output_path.display());

    match write_csv(cards, &config.csv_output_path)
        .with_context(|| format!("saving {}", config.csv_output_path.display()))?
    {
        CsvOutcome::Written { rows } => {
            info!("Saved {} rows to {}", rows, config.csv_output_path.display())
        }
        CsvOutcome::Skipped => info!("No cards, skipped {}", config.csv_output_path.display()),
    }

    Ok(())
}
