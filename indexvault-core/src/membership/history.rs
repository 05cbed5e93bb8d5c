//! Membership history loading from the `date,tickers` CSV layout.
//!
//! Each row holds one observation date and the full roster on that date as a
//! single comma-separated field:
//!
//! ```text
//! date,tickers
//! 1996-01-02,"AAL,AAPL,ABT,..."
//! ```

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use super::timeline::validate_order;
use super::{MembershipError, MembershipTimeline};
use crate::domain::{MembershipRecord, Ticker};

/// Validated, date-ordered membership records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipHistory {
    records: Vec<MembershipRecord>,
}

impl MembershipHistory {
    /// Wrap records, checking strictly increasing `as_of` dates.
    pub fn new(records: Vec<MembershipRecord>) -> Result<Self, MembershipError> {
        validate_order(&records)?;
        Ok(Self { records })
    }

    pub fn records(&self) -> &[MembershipRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records with `start <= as_of <= end`.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| r.as_of >= start && r.as_of <= end)
                .cloned()
                .collect(),
        }
    }

    /// Alphabetically sorted union of every ticker that appears in any record.
    pub fn all_constituents(&self) -> Vec<Ticker> {
        let all: BTreeSet<&Ticker> = self.records.iter().flat_map(|r| r.tickers.iter()).collect();
        all.into_iter().cloned().collect()
    }

    pub fn observation_dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.as_of).collect()
    }

    pub fn timeline(&self) -> Result<MembershipTimeline, MembershipError> {
        MembershipTimeline::build(&self.records)
    }
}

/// Load membership records from a CSV file.
///
/// A missing file is reported as [`MembershipError::NotFound`].
pub fn load_membership_csv(path: &Path) -> Result<MembershipHistory, MembershipError> {
    if !path.is_file() {
        return Err(MembershipError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let file = std::fs::File::open(path)?;
    parse_membership_csv(file)
}

/// Parse membership records from any CSV reader with `date` and `tickers` columns.
pub fn parse_membership_csv<R: Read>(reader: R) -> Result<MembershipHistory, MembershipError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers.iter().position(|h| h.trim() == name).ok_or_else(|| {
            MembershipError::Csv(csv::Error::from(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("missing '{name}' column"),
            )))
        })
    };
    let date_col = column("date")?;
    let tickers_col = column("tickers")?;

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let raw_date = row.get(date_col).unwrap_or("").trim();
        let as_of = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
            MembershipError::InvalidDate {
                line,
                value: raw_date.to_string(),
            }
        })?;
        let raw_tickers = row.get(tickers_col).unwrap_or("");
        let symbols = raw_tickers.split(',').filter(|s| !s.trim().is_empty());
        records.push(MembershipRecord::new(as_of, symbols)?);
    }

    MembershipHistory::new(records)
}
