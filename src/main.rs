use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use depletion_forecast::config::{DEFAULT_HORIZON_DAYS, DEFAULT_WARNING_CUTOFF_DAY};
use depletion_forecast::{run, DuplicatePolicy, ForecastSettings, RunConfig};

#[derive(Debug, Parser)]
#[command(name = "depletion-forecast")]
#[command(about = "Project per-item stock over the coming days and flag early stock-outs")]
struct Cli {
    /// Shipments file (OPC, Due Date, Ship Qty)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Reference file (OPC, On Hand, ADD, Descr, SKU)
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Output workbook (.xlsx) or directory for CSV sheets
    #[arg(long)]
    output: Option<PathBuf>,

    /// Anchor date (YYYY-MM-DD); defaults to the input file's creation date
    #[arg(long)]
    reference_date: Option<NaiveDate>,

    #[arg(long, default_value_t = DEFAULT_HORIZON_DAYS)]
    horizon_days: usize,

    /// Flag items that go negative on or before this day
    #[arg(long, default_value_t = DEFAULT_WARNING_CUTOFF_DAY)]
    warning_days: usize,

    #[arg(long, value_enum, default_value_t = Duplicates::KeepFirst)]
    duplicates: Duplicates,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Duplicates {
    KeepFirst,
    MergeSum,
    Reject,
}

impl From<Duplicates> for DuplicatePolicy {
    fn from(value: Duplicates) -> Self {
        match value {
            Duplicates::KeepFirst => DuplicatePolicy::KeepFirst,
            Duplicates::MergeSum => DuplicatePolicy::MergeSum,
            Duplicates::Reject => DuplicatePolicy::Reject,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = RunConfig {
        input: cli.input,
        reference: cli.reference,
        output: cli.output,
        reference_date: cli.reference_date,
        settings: ForecastSettings {
            horizon_days: cli.horizon_days,
            warning_cutoff_day: cli.warning_days,
            duplicate_policy: cli.duplicates.into(),
        },
    };

    let summary = run(&config).context("forecast failed")?;
    println!(
        "Output saved to {} ({} items, {} flagged, reference date {})",
        summary.output.display(),
        summary.items,
        summary.flagged,
        summary.reference_date
    );
    Ok(())
}
