//! Index membership history: loading snapshots and deriving membership intervals.

pub mod history;
pub mod timeline;

pub use history::{load_membership_csv, parse_membership_csv, MembershipHistory};
pub use timeline::MembershipTimeline;

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating membership records.
///
/// All of these are fatal for the run: a timeline built from a malformed
/// history would silently misclassify gaps.
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("membership records not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("line {line}: unparseable date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { line: u64, value: String },

    #[error("duplicate as_of date {date}")]
    DuplicateDate { date: NaiveDate },

    #[error("as_of dates out of order: {date} follows {previous}")]
    OutOfOrder { previous: NaiveDate, date: NaiveDate },

    #[error("record {date} lists '{symbol}' more than once")]
    DuplicateSymbol { date: NaiveDate, symbol: String },

    #[error("record {date} contains an empty symbol")]
    EmptySymbol { date: NaiveDate },

    #[error("membership csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("membership io: {0}")]
    Io(#[from] std::io::Error),
}
