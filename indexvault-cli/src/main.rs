//! IndexVault CLI: build a gap-free daily price dataset for an index's
//! historical constituents.
//!
//! Commands, in pipeline order:
//! - `constituents`: load membership snapshots and list every ticker in range
//! - `download`: fetch the universe from the primary vendor into the data store
//! - `gaps`: find missing trading days while each ticker was a member
//! - `backfill`: request those days from the secondary vendor, merge, store
//! - `check`: verify every stored series is strictly ascending by date

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;

use indexvault_core::data::{ContainerFormat, StdoutProgress};
use indexvault_runner::report::{save_backfill_artifacts, save_constituents, save_gap_artifacts};
use indexvault_runner::{
    build_provider, init_logging, run_backfill, run_check, run_constituents, run_download,
    run_gaps, BackfillInput, BackfillOutcome, CalendarSource, CheckTarget, GapsOutcome,
    LogConfig, PipelineConfig, VendorKind,
};

const DEFAULT_CONFIG: &str = "indexvault.toml";

#[derive(Parser)]
#[command(
    name = "indexvault",
    about = "IndexVault CLI: historical index constituents, price download and gap backfill"
)]
struct Cli {
    /// Path to the TOML config. Defaults to ./indexvault.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that replace config values for this invocation.
#[derive(Args)]
struct Overrides {
    /// Start date (YYYY-MM-DD).
    #[arg(long, global = true)]
    start: Option<String>,

    /// End date (YYYY-MM-DD).
    #[arg(long, global = true)]
    end: Option<String>,

    /// Container format: csv or parquet.
    #[arg(long, global = true)]
    format: Option<String>,

    /// Membership CSV with header `date,tickers`.
    #[arg(long, global = true)]
    membership: Option<PathBuf>,

    /// Primary container directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Merged container directory.
    #[arg(long, global = true)]
    merged_dir: Option<PathBuf>,

    /// Report and attendance directory.
    #[arg(long, global = true)]
    reports_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List every ticker that was an index member in the date range.
    Constituents,
    /// Download daily bars for the universe from the primary vendor.
    Download {
        /// Use the offline synthetic vendor instead of the configured one.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Detect missing trading days during each ticker's membership.
    Gaps {
        /// Expected calendar: reference or union.
        #[arg(long)]
        calendar: Option<String>,

        /// Reference ticker for the expected calendar.
        #[arg(long)]
        reference: Option<String>,
    },
    /// Fill missing days from the secondary vendor and write merged series.
    Backfill {
        /// Start from the previous attempt's still-missing report.
        #[arg(long, default_value_t = false)]
        resume: bool,

        /// Use the offline synthetic vendor instead of the configured one.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Verify stored series are strictly ascending with no duplicate dates.
    Check {
        /// Check the primary data store instead of the merged store.
        #[arg(long, default_value_t = false)]
        data: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli.overrides)?;
    if let Commands::Gaps { calendar, reference } = &cli.command {
        if let Some(calendar) = calendar {
            config.gaps.calendar = parse_calendar(calendar)?;
        }
        if let Some(reference) = reference {
            config.gaps.reference_ticker = reference.clone();
        }
    }
    config.validate()?;

    let mut log = LogConfig::from_section(&config.logging).map_err(anyhow::Error::msg)?;
    if cli.verbose {
        log = log.with_default_level("debug");
    }
    init_logging(&log).map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    match cli.command {
        Commands::Constituents => cmd_constituents(&config),
        Commands::Download { synthetic } => cmd_download(&config, synthetic),
        Commands::Gaps { .. } => cmd_gaps(&config),
        Commands::Backfill { resume, synthetic } => cmd_backfill(&config, resume, synthetic),
        Commands::Check { data } => cmd_check(&config, data),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            Ok(PipelineConfig::from_file(Path::new(DEFAULT_CONFIG))?)
        }
        None => {
            eprintln!("No {DEFAULT_CONFIG} found; using built-in defaults.");
            Ok(PipelineConfig::default())
        }
    }
}

fn apply_overrides(config: &mut PipelineConfig, o: &Overrides) -> Result<()> {
    if let Some(start) = &o.start {
        config.range.start = parse_date(start)?;
    }
    if let Some(end) = &o.end {
        config.range.end = Some(parse_date(end)?);
    }
    if let Some(format) = &o.format {
        config.storage.format = format.parse::<ContainerFormat>()?;
    }
    if let Some(path) = &o.membership {
        config.paths.membership_csv = path.clone();
    }
    if let Some(path) = &o.data_dir {
        config.paths.data_dir = path.clone();
    }
    if let Some(path) = &o.merged_dir {
        config.paths.merged_dir = path.clone();
    }
    if let Some(path) = &o.reports_dir {
        config.paths.reports_dir = path.clone();
    }
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

fn parse_calendar(s: &str) -> Result<CalendarSource> {
    match s {
        "reference" => Ok(CalendarSource::Reference),
        "union" => Ok(CalendarSource::Union),
        _ => bail!("unknown calendar '{s}'. Valid: reference, union"),
    }
}

fn cmd_constituents(config: &PipelineConfig) -> Result<()> {
    let outcome = run_constituents(config)?;
    let path = save_constituents(&outcome, config)?;

    println!("Membership: {}", config.paths.membership_csv.display());
    println!(
        "Records: {} ({} to {})",
        outcome.records, outcome.first, outcome.last
    );
    println!("Constituents: {}", outcome.tickers.len());
    println!("Rejoined after leaving: {}", outcome.rejoined.len());
    println!("Saved to: {}", path.display());
    Ok(())
}

fn cmd_download(config: &PipelineConfig, synthetic: bool) -> Result<()> {
    let kind = if synthetic {
        VendorKind::Synthetic
    } else {
        config.vendors.primary
    };
    let provider = build_provider(kind, config)?;
    let outcome = run_download(config, provider.as_ref(), &StdoutProgress)?;
    let s = &outcome.summary;

    println!();
    println!("{:<16} {:>8}", "Vendor", outcome.vendor);
    println!("{:<16} {:>8}", "Requested", s.total);
    println!("{:<16} {:>8}", "Available", s.available.len());
    println!("{:<16} {:>8}", "Not available", s.not_available.len());
    println!("{:<16} {:>8}", "Field errors", s.field_errors.len());
    println!("{:<16} {:>8}", "Errored", s.errored.len());
    println!("{:<16} {:>8}", "Aborted", s.aborted.len());
    println!("Attendance: {}", outcome.available_log.display());
    println!("            {}", outcome.not_available_log.display());

    if !outcome.succeeded() {
        for ticker in &outcome.unsaved {
            eprintln!("Stored but missing on disk: {ticker}");
        }
        for ticker in &s.errored {
            eprintln!("Fetch failed, rerun download: {ticker}");
        }
        if !s.aborted.is_empty() {
            eprintln!("Circuit breaker stopped the run; {} tickers not attempted", s.aborted.len());
        }
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_gaps(config: &PipelineConfig) -> Result<()> {
    let outcome = run_gaps(config)?;
    let paths = save_gap_artifacts(&outcome, config)?;
    print_gaps(&outcome);

    println!("Missing-date report: {}", outcome.report_path.display());
    for path in paths {
        println!("Saved: {}", path.display());
    }
    Ok(())
}

fn print_gaps(outcome: &GapsOutcome) {
    let missing: usize = outcome.true_missing.values().map(|d| d.len()).sum();
    println!("Calendar days: {}", outcome.calendar_days);
    println!(
        "Universe: {} tickers ({} with no stored data)",
        outcome.universe,
        outcome.not_stored.len()
    );
    if let Some(odd) = &outcome.nonuniform {
        println!("Date index differs from reference: {} tickers", odd.len());
    }
    println!(
        "Missing: {} raw, {} during membership across {} tickers",
        outcome.raw_missing,
        missing,
        outcome.true_missing.len()
    );
    if outcome.per_year.is_empty() {
        return;
    }
    println!();
    println!("{:<6} {:>10}", "Year", "Missing");
    println!("{}", "-".repeat(17));
    for (year, count) in &outcome.per_year {
        println!("{:<6} {:>10}", year, count);
    }
}

fn cmd_backfill(config: &PipelineConfig, resume: bool, synthetic: bool) -> Result<()> {
    let kind = if synthetic {
        VendorKind::Synthetic
    } else {
        config.vendors.secondary
    };
    let provider = build_provider(kind, config)?;
    let input = if resume {
        BackfillInput::Resume
    } else {
        BackfillInput::Initial
    };
    let outcome = run_backfill(config, provider.as_ref(), input)?;
    let paths = save_backfill_artifacts(&outcome, config)?;
    print_backfill(&outcome);

    println!("Still missing: {}", outcome.still_missing_path.display());
    for path in paths {
        println!("Saved: {}", path.display());
    }
    if !outcome.reconciliation.report.not_available.is_empty() {
        warn!(
            count = outcome.reconciliation.report.not_available.len(),
            vendor = %outcome.vendor,
            "tickers not offered by vendor"
        );
    }
    Ok(())
}

fn print_backfill(outcome: &BackfillOutcome) {
    let report = &outcome.reconciliation.report;
    println!("Vendor: {} ({} tickers requested)", outcome.vendor, outcome.requested.len());
    println!(
        "Missing: {} before, {} after ({} reduced)",
        report.total_before, report.total_still_missing, report.total_reduced
    );
    println!(
        "Tickers: {} filled, {} incomplete, {} not available",
        report.filled.len(),
        report.incomplete.len(),
        report.not_available.len()
    );
    println!("Merged series written: {}", outcome.merged.len());
    println!();
    println!(
        "{:<8} {:<10} {:>8} {:>8} {:>8}",
        "Attempt", "Vendor", "Before", "After", "Reduced"
    );
    println!("{}", "-".repeat(46));
    for a in &outcome.ledger.attempts {
        println!(
            "{:<8} {:<10} {:>8} {:>8} {:>8}",
            a.attempt, a.vendor, a.missing_before, a.missing_after, a.reduced
        );
    }
}

fn cmd_check(config: &PipelineConfig, data: bool) -> Result<()> {
    let target = if data {
        CheckTarget::Data
    } else {
        CheckTarget::Merged
    };
    let outcome = run_check(config, target)?;
    println!(
        "Checked {} series in {}: all strictly ascending",
        outcome.checked,
        outcome.dir.display()
    );
    if !outcome.absent.is_empty() {
        println!("No container for {} universe tickers", outcome.absent.len());
    }
    Ok(())
}
