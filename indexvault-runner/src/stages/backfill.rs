//! `backfill`: request gaps from the secondary vendor, reconcile, merge and
//! persist ordinance-clean series.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use indexvault_core::analysis::MissingReport;
use indexvault_core::data::{open_store, DataError, SeriesStore, VendorProvider};
use indexvault_core::domain::{Ticker, TickerSeries, VendorBatch};
use indexvault_core::reconcile::{
    check_all, merge_all, reconcile, still_missing_for_json, AttemptSummary, BackfillLedger,
    MissingDates, Reconciliation,
};

use super::StageError;
use crate::config::PipelineConfig;

/// Which missing-date report an attempt starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackfillInput {
    /// The report written by `gaps`; primary series come from the data store.
    #[default]
    Initial,
    /// The still-missing report of the previous attempt; earlier merged
    /// series take precedence over the data store.
    Resume,
}

#[derive(Debug)]
pub struct BackfillOutcome {
    pub vendor: String,
    pub source: PathBuf,
    /// Tickers with at least one missing date, as sent to the vendor.
    pub requested: Vec<Ticker>,
    pub reconciliation: Reconciliation,
    pub attempt: AttemptSummary,
    pub ledger: BackfillLedger,
    /// Tickers written to the merged store.
    pub merged: Vec<Ticker>,
    pub still_missing_path: PathBuf,
}

pub fn run_backfill(
    config: &PipelineConfig,
    provider: &dyn VendorProvider,
    input: BackfillInput,
) -> Result<BackfillOutcome, StageError> {
    let (source, producer) = match input {
        BackfillInput::Initial => (config.missing_report_path(), "gaps"),
        BackfillInput::Resume => (config.still_missing_path(), "backfill"),
    };
    if !source.is_file() {
        return Err(StageError::MissingArtifact {
            path: source,
            stage: producer,
        });
    }
    let missing = MissingReport::load(&source)?.into_inner();
    let mut ledger = load_ledger(&config.ledger_path())?;
    let requested: Vec<Ticker> = missing
        .iter()
        .filter(|(_, dates)| !dates.is_empty())
        .map(|(t, _)| t.clone())
        .collect();

    let batch = match gap_window(&missing) {
        Some((start, end)) => {
            info!(
                vendor = provider.name(),
                tickers = requested.len(),
                %start,
                %end,
                "requesting missing dates"
            );
            provider.fetch_batch(&requested, start, end)?
        }
        None => VendorBatch::new(),
    };

    let reconciliation = reconcile(&missing, &batch)?;
    for e in &reconciliation.errors {
        debug!(ticker = %e.ticker, date = %e.date, detail = %e.detail, "vendor field error");
    }
    if !reconciliation.errors.is_empty() {
        warn!(count = reconciliation.errors.len(), "vendor field errors left dates missing");
    }

    let merged_store = open_store(config.storage.format, &config.paths.merged_dir);
    let data_store = open_store(config.storage.format, &config.paths.data_dir);
    let primary = match input {
        BackfillInput::Initial => data_store.load_many(&requested)?.loaded,
        BackfillInput::Resume => {
            load_preferring(merged_store.as_ref(), data_store.as_ref(), &requested)?
        }
    };
    let secondary: BTreeMap<Ticker, TickerSeries> = batch
        .into_iter()
        .filter_map(|(t, r)| r.into_series().map(|s| (t, s)))
        .collect();

    let merged = merge_all(&primary, &secondary)?;
    // Nothing is written unless every merged series passes.
    check_all(merged.values())?;
    for (ticker, series) in &merged {
        merged_store.write(ticker, series, "merged")?;
    }

    // Ledger and still-missing report advance only after the merged writes.
    let attempt = ledger.record(provider.name(), &reconciliation.report).clone();
    let still = still_missing_for_json(&reconciliation.still_missing, &reconciliation.report.filled);
    let still_missing_path = config.still_missing_path();
    MissingReport::new(still).save(&still_missing_path)?;
    save_ledger(&config.ledger_path(), &ledger)?;

    info!(
        attempt = attempt.attempt,
        before = attempt.missing_before,
        after = attempt.missing_after,
        filled = attempt.filled,
        merged = merged.len(),
        "backfill attempt finished"
    );

    Ok(BackfillOutcome {
        vendor: provider.name().to_string(),
        source,
        requested,
        reconciliation,
        attempt,
        ledger,
        merged: merged.into_keys().collect(),
        still_missing_path,
    })
}

/// Earliest and latest missing date across all tickers.
fn gap_window(missing: &MissingDates) -> Option<(NaiveDate, NaiveDate)> {
    let start = missing.values().filter_map(|d| d.first()).min()?;
    let end = missing.values().filter_map(|d| d.last()).max()?;
    Some((*start, *end))
}

fn load_preferring(
    first: &dyn SeriesStore,
    second: &dyn SeriesStore,
    tickers: &[Ticker],
) -> Result<BTreeMap<Ticker, TickerSeries>, DataError> {
    let from_first = first.load_many(tickers)?;
    let mut loaded = from_first.loaded;
    loaded.extend(second.load_many(&from_first.missing)?.loaded);
    Ok(loaded)
}

fn load_ledger(path: &Path) -> Result<BackfillLedger, DataError> {
    if !path.is_file() {
        return Ok(BackfillLedger::new());
    }
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

fn save_ledger(path: &Path, ledger: &BackfillLedger) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(ledger)?)?;
    Ok(())
}
