//! `constituents`: load membership history and list every ticker in range.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use indexvault_core::domain::Ticker;

use super::{load_history, StageError};
use crate::config::PipelineConfig;

#[derive(Debug, Clone, Serialize)]
pub struct ConstituentsOutcome {
    pub records: usize,
    pub first: NaiveDate,
    pub last: NaiveDate,
    /// Tickers that were members at any observation in range, sorted.
    pub tickers: Vec<Ticker>,
    /// Tickers with more than one membership interval.
    pub rejoined: Vec<Ticker>,
}

pub fn run_constituents(config: &PipelineConfig) -> Result<ConstituentsOutcome, StageError> {
    let history = load_history(config)?;
    let timeline = history.timeline()?;
    let dates = history.observation_dates();

    let rejoined = timeline
        .as_map()
        .iter()
        .filter(|(_, intervals)| intervals.len() > 1)
        .map(|(t, _)| t.clone())
        .collect();

    let outcome = ConstituentsOutcome {
        records: history.len(),
        first: dates[0],
        last: dates[dates.len() - 1],
        tickers: history.all_constituents(),
        rejoined,
    };
    info!(
        records = outcome.records,
        tickers = outcome.tickers.len(),
        first = %outcome.first,
        last = %outcome.last,
        "membership history loaded"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_constituents_in_range() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("history.csv");
        std::fs::write(
            &csv,
            "date,tickers\n2006-12-01,\"OLD,AAA\"\n2007-02-01,\"AAA,BBB\"\n2008-02-01,\"BBB\"\n2009-02-01,\"AAA,BBB\"\n",
        )
        .unwrap();

        let mut config = PipelineConfig::default();
        config.paths.membership_csv = csv;
        config.range.end = NaiveDate::from_ymd_opt(2010, 1, 1);

        let outcome = run_constituents(&config).unwrap();
        assert_eq!(outcome.records, 3);
        assert_eq!(outcome.tickers, vec!["AAA", "BBB"]);
        assert_eq!(outcome.rejoined, vec!["AAA"]);
        assert_eq!(outcome.first, NaiveDate::from_ymd_opt(2007, 2, 1).unwrap());
    }

    #[test]
    fn empty_range_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("history.csv");
        std::fs::write(&csv, "date,tickers\n2001-01-01,\"AAA\"\n").unwrap();

        let mut config = PipelineConfig::default();
        config.paths.membership_csv = csv;
        assert!(matches!(
            run_constituents(&config),
            Err(StageError::EmptyRange { .. })
        ));
    }
}
