use clap::Parser;
use log::LevelFilter;
use std::fmt::Display;
use std::io::{self, Write};
use std::path::PathBuf;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::dataflow::projection::Card;

#[derive(Parser, Debug)]
#[clap(author, version, about, name = "cardfetch", long_about = None)]
pub struct Args {
    /// API root; `/cards` is appended to it
    #[clap(env = "CARDFETCH_BASE_URL", long, default_value = "https://api.pokemontcg.io/v2")]
    pub base_url: String,
    /// Cards requested per page (1-250)
    #[clap(env = "CARDFETCH_PAGE_SIZE", long, default_value_t = 250)]
    pub page_size: u16,
    /// Stop after this many cards
    #[clap(env = "CARDFETCH_MAX_RECORDS", short = 'n', long)]
    pub max_records: Option<usize>,
    #[clap(env = "CARDFETCH_TIMEOUT_SECS", long, default_value_t = 30)]
    pub timeout_secs: u64,
    /// Pause between page requests
    #[clap(env = "CARDFETCH_DELAY_MS", long, default_value_t = 100)]
    pub delay_ms: u64,
    #[clap(env = "CARDFETCH_JSON_OUT", long, default_value = "data/pokemon_cards.json")]
    pub json_out: PathBuf,
    #[clap(env = "CARDFETCH_CSV_OUT", long, default_value = "data/pokemon_cards.csv")]
    pub csv_out: PathBuf,
    /// Write whatever was fetched even if a request failed midway
    #[clap(env = "CARDFETCH_KEEP_PARTIAL", long)]
    pub keep_partial: bool,
    /// How many cards to list once done
    #[clap(env = "CARDFETCH_SAMPLE", long, default_value_t = 5)]
    pub sample: usize,
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

pub struct Colors {
    pub error: ColorSpec,
    pub warning: ColorSpec,
    pub heading: ColorSpec,
    pub reset: ColorSpec,
}

pub struct Cli {
    pub stderr: StandardStream,
    pub stdout: StandardStream,
    pub args: Args,
    pub colors: Colors,
}

/// Entrypoint for the app
impl Cli {
    pub fn new() -> Cli {
        let args = Args::parse();
        let stderr = StandardStream::stderr(ColorChoice::Always);
        let stdout = StandardStream::stdout(ColorChoice::Auto);

        let mut colors = Colors {
            error: ColorSpec::new(),
            warning: ColorSpec::new(),
            heading: ColorSpec::new(),
            reset: ColorSpec::new(),
        };

        colors.error.set_fg(Some(Color::Red)).set_bold(true);
        colors.warning.set_fg(Some(Color::Yellow));
        colors.heading.set_bold(true);
        colors.reset.set_fg(None);

        Cli {
            stderr,
            stdout,
            args,
            colors,
        }
    }

    pub fn report_error(&mut self, err: &dyn Display) -> io::Result<()> {
        self.stderr.set_color(&self.colors.error)?;
        write!(self.stderr, "error:")?;
        self.stderr.set_color(&self.colors.reset)?;
        writeln!(self.stderr, " {}", err)
    }

    pub fn report_partial(&mut self, fetched: usize, cause: &dyn Display, kept: bool) -> io::Result<()> {
        self.stderr.set_color(&self.colors.warning)?;
        write!(self.stderr, "warning:")?;
        self.stderr.set_color(&self.colors.reset)?;
        writeln!(
            self.stderr,
            " fetch stopped early after {} cards ({})",
            fetched, cause
        )?;

        if !kept {
            writeln!(
                self.stderr,
                "nothing was written; rerun with --keep-partial to save what was fetched"
            )?;
        }

        Ok(())
    }

    pub fn print_summary(&mut self, cards: &[Card], sample_size: usize) -> io::Result<()> {
        self.stdout.set_color(&self.colors.heading)?;
        writeln!(self.stdout, "\nFetched {} cards", cards.len())?;

        if cards.is_empty() || sample_size == 0 {
            self.stdout.reset()?;
            return Ok(());
        }

        writeln!(
            self.stdout,
            "\n--- Sample (first {}) ---",
            sample_size.min(cards.len())
        )?;
        self.stdout.reset()?;

        write_sample(&mut self.stdout, cards, sample_size)
    }
}

fn write_sample(out: &mut impl Write, cards: &[Card], sample_size: usize) -> io::Result<()> {
    for (i, card) in cards.iter().take(sample_size).enumerate() {
        writeln!(
            out,
            "\n{}. {} ({} #{})",
            i + 1,
            card.name,
            card.set_name,
            card.number
        )?;
        writeln!(out, "   ID: {}", card.id)?;
        writeln!(out, "   Image (small): {}", card.image_small)?;
        writeln!(out, "   Image (large): {}", card.image_large)?;
    }

    Ok(())
}
