//! Report artifacts: JSON summaries and CSV tables for each stage.
//!
//! Stages persist what later stages consume (missing-date reports, the
//! ledger, attendance logs). This module writes the human- and tool-facing
//! extras next to them in `reports_dir`:
//! - `constituents.json`
//! - `missing_per_year.csv`, `history_lengths.csv`
//! - `reconciliation_report.json`, `reconciliation.csv`, `vendor_errors.csv`,
//!   `backfill_ledger.csv`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use indexvault_core::domain::VendorFieldError;
use indexvault_core::reconcile::{BackfillLedger, ReconciliationReport};

use crate::config::PipelineConfig;
use crate::stages::{BackfillOutcome, ConstituentsOutcome, GapsOutcome};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize report to JSON")
}

// ─── CSV ────────────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: year, missing
pub fn export_per_year_csv(per_year: &BTreeMap<i32, usize>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["year", "missing"])?;
    for (year, count) in per_year {
        wtr.write_record([year.to_string(), count.to_string()])?;
    }
    finish(wtr)
}

/// Columns: history_length, tickers
pub fn export_histogram_csv(histogram: &BTreeMap<usize, usize>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["history_length", "tickers"])?;
    for (len, count) in histogram {
        wtr.write_record([len.to_string(), count.to_string()])?;
    }
    finish(wtr)
}

/// Columns: ticker, before, still_missing, reduced, status
///
/// `status` is `filled`, `incomplete`, or `not_available`.
pub fn export_reconciliation_csv(report: &ReconciliationReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["ticker", "before", "still_missing", "reduced", "status"])?;
    for (ticker, counts) in &report.per_ticker {
        let status = if report.filled.contains(ticker) {
            "filled"
        } else if report.not_available.contains(ticker) {
            "not_available"
        } else {
            "incomplete"
        };
        wtr.write_record([
            ticker.clone(),
            counts.before.to_string(),
            counts.still_missing.to_string(),
            counts.reduced.to_string(),
            status.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Columns: ticker, date, detail
pub fn export_field_errors_csv(errors: &[VendorFieldError]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["ticker", "date", "detail"])?;
    for e in errors {
        wtr.write_record([e.ticker.clone(), e.date.to_string(), e.detail.clone()])?;
    }
    finish(wtr)
}

/// Columns: attempt, vendor, missing_before, missing_after, reduced, filled
pub fn export_ledger_csv(ledger: &BackfillLedger) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["attempt", "vendor", "missing_before", "missing_after", "reduced", "filled"])?;
    for a in &ledger.attempts {
        wtr.write_record([
            a.attempt.to_string(),
            a.vendor.clone(),
            a.missing_before.to_string(),
            a.missing_after.to_string(),
            a.reduced.to_string(),
            a.filled.to_string(),
        ])?;
    }
    finish(wtr)
}

// ─── Artifact sets ──────────────────────────────────────────────────

fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report dir: {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

pub fn save_constituents(outcome: &ConstituentsOutcome, config: &PipelineConfig) -> Result<PathBuf> {
    let path = config.constituents_path();
    write_artifact(&path, &export_json(outcome)?)?;
    Ok(path)
}

/// Returns the paths written, in a fixed order.
pub fn save_gap_artifacts(outcome: &GapsOutcome, config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let dir = &config.paths.reports_dir;
    let per_year = dir.join("missing_per_year.csv");
    write_artifact(&per_year, &export_per_year_csv(&outcome.per_year)?)?;
    let lengths = dir.join("history_lengths.csv");
    write_artifact(&lengths, &export_histogram_csv(&outcome.histogram)?)?;
    Ok(vec![per_year, lengths])
}

/// Returns the paths written, in a fixed order.
pub fn save_backfill_artifacts(
    outcome: &BackfillOutcome,
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>> {
    let dir = &config.paths.reports_dir;
    let report = &outcome.reconciliation.report;

    let json = dir.join("reconciliation_report.json");
    write_artifact(&json, &export_json(report)?)?;
    let table = dir.join("reconciliation.csv");
    write_artifact(&table, &export_reconciliation_csv(report)?)?;
    let errors = dir.join("vendor_errors.csv");
    write_artifact(&errors, &export_field_errors_csv(&outcome.reconciliation.errors)?)?;
    let ledger = dir.join("backfill_ledger.csv");
    write_artifact(&ledger, &export_ledger_csv(&outcome.ledger)?)?;
    Ok(vec![json, table, errors, ledger])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use indexvault_core::reconcile::TickerCounts;
    use proptest::prelude::*;

    fn report() -> ReconciliationReport {
        let mut r = ReconciliationReport::default();
        r.per_ticker.insert(
            "AAA".into(),
            TickerCounts { before: 3, still_missing: 0, reduced: 3 },
        );
        r.per_ticker.insert(
            "BBB".into(),
            TickerCounts { before: 2, still_missing: 1, reduced: 1 },
        );
        r.per_ticker.insert(
            "ZZZ".into(),
            TickerCounts { before: 4, still_missing: 4, reduced: 0 },
        );
        r.filled.insert("AAA".into());
        r.incomplete.extend(["BBB".to_string(), "ZZZ".to_string()]);
        r.not_available.insert("ZZZ".into());
        r
    }

    #[test]
    fn reconciliation_csv_has_status_column() {
        let csv = export_reconciliation_csv(&report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "ticker,before,still_missing,reduced,status");
        assert_eq!(lines[1], "AAA,3,0,3,filled");
        assert_eq!(lines[2], "BBB,2,1,1,incomplete");
        assert_eq!(lines[3], "ZZZ,4,4,0,not_available");
    }

    #[test]
    fn field_errors_csv_quotes_details() {
        let errors = vec![VendorFieldError {
            ticker: "AAA".into(),
            date: NaiveDate::from_ymd_opt(2020, 3, 2).unwrap(),
            detail: "missing fields: fClose, fVolume".into(),
        }];
        let csv = export_field_errors_csv(&errors).unwrap();
        assert!(csv.contains("AAA,2020-03-02,\"missing fields: fClose, fVolume\""));
    }

    #[test]
    fn report_json_reads_back() {
        let json = export_json(&report()).unwrap();
        assert!(json.contains("\"not_available\""));
        let back: ReconciliationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report());
    }

    #[test]
    fn ledger_csv_lists_attempts() {
        let mut ledger = BackfillLedger::new();
        let mut r = report();
        r.total_before = 9;
        r.total_still_missing = 5;
        r.total_reduced = 4;
        ledger.record("iex", &r);
        let csv = export_ledger_csv(&ledger).unwrap();
        assert_eq!(csv.lines().nth(1), Some("1,iex,9,5,4,1"));
    }

    proptest! {
        #[test]
        fn per_year_csv_has_one_row_per_year(
            per_year in prop::collection::btree_map(1990i32..2030, 0usize..10_000, 0..20)
        ) {
            let csv = export_per_year_csv(&per_year).unwrap();
            let mut reader = csv::Reader::from_reader(csv.as_bytes());
            let rows: Vec<(i32, usize)> = reader
                .deserialize()
                .collect::<Result<_, _>>()
                .unwrap();
            prop_assert_eq!(rows, per_year.into_iter().collect::<Vec<_>>());
        }
    }
}
