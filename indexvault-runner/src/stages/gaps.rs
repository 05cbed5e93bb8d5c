//! `gaps`: compare stored dates with the expected calendar, keep only dates
//! on which the ticker was an index member, and write the missing-date report.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use indexvault_core::analysis::{
    check_date_uniformity, history_length_histogram, missing_per_year, MissingReport,
};
use indexvault_core::data::open_store;
use indexvault_core::domain::{Ticker, TickerSeries};
use indexvault_core::reconcile::{
    filter_to_membership, missing_by_ticker, reference_calendar, total_dates, union_calendar,
    MissingDates,
};

use super::{load_history, StageError};
use crate::config::{CalendarSource, PipelineConfig};

#[derive(Debug)]
pub struct GapsOutcome {
    /// Trading days in the expected calendar, within the configured range.
    pub calendar_days: usize,
    pub universe: usize,
    /// Constituents with no container; treated as having no stored dates.
    pub not_stored: Vec<Ticker>,
    /// Missing (ticker, date) pairs before the membership filter.
    pub raw_missing: usize,
    pub true_missing: MissingDates,
    pub per_year: BTreeMap<i32, usize>,
    /// Stored history length → ticker count.
    pub histogram: BTreeMap<usize, usize>,
    /// Stored tickers whose date index differs from the reference ticker's.
    /// `None` when the calendar is the union of stored dates.
    pub nonuniform: Option<Vec<Ticker>>,
    pub report_path: PathBuf,
}

pub fn run_gaps(config: &PipelineConfig) -> Result<GapsOutcome, StageError> {
    let history = load_history(config)?;
    let timeline = history.timeline()?;
    let tickers = history.all_constituents();
    let store = open_store(config.storage.format, &config.paths.data_dir);

    let loaded = store.load_many(&tickers)?;
    let start = config.range.start;
    let end = config.range.end_date();
    let in_range = |d: &NaiveDate| *d >= start && *d <= end;

    let (calendar, nonuniform) = match config.gaps.calendar {
        CalendarSource::Reference => {
            let reference = config.gaps.reference_ticker.as_str();
            let mut with_reference = loaded.loaded.clone();
            if !with_reference.contains_key(reference) {
                with_reference.insert(reference.to_string(), store.load(reference)?);
            }
            let calendar = reference_calendar(&with_reference, reference)?;
            let stored: Vec<Ticker> = loaded.loaded.keys().cloned().collect();
            let nonuniform = check_date_uniformity(&with_reference, &stored, reference)?;
            (calendar, Some(nonuniform))
        }
        CalendarSource::Union => (union_calendar(&loaded.loaded), None),
    };
    let calendar: Vec<NaiveDate> = calendar.into_iter().filter(in_range).collect();

    let histogram = history_length_histogram(&loaded.loaded);
    let mut series = loaded.loaded;
    for ticker in &loaded.missing {
        debug!(ticker = %ticker, "no container; every calendar day counts as missing");
        series.insert(ticker.clone(), TickerSeries::empty(ticker.as_str()));
    }

    let raw = missing_by_ticker(&series, &calendar);
    let true_missing = filter_to_membership(&raw, &timeline);
    let report = MissingReport::new(true_missing);
    let report_path = config.missing_report_path();
    report.save(&report_path)?;

    info!(
        calendar_days = calendar.len(),
        raw = total_dates(&raw),
        tickers = report.ticker_count(),
        missing = report.date_count(),
        "gap detection finished"
    );

    let true_missing = report.into_inner();
    Ok(GapsOutcome {
        calendar_days: calendar.len(),
        universe: tickers.len(),
        not_stored: loaded.missing,
        raw_missing: total_dates(&raw),
        per_year: missing_per_year(&true_missing),
        true_missing,
        histogram,
        nonuniform,
        report_path,
    })
}
