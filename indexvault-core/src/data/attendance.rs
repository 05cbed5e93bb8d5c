//! Attendance logs: which tickers a vendor did and did not deliver.
//!
//! Files are `available_<vendor>_tickers.json` and
//! `not_available_<vendor>_tickers.json` holding a JSON array of tickers.
//! Rerunning a download appends new tickers to an existing log.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::provider::DataError;
use super::store::write_atomic;
use crate::domain::Ticker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attendance {
    Available,
    NotAvailable,
}

impl Attendance {
    fn prefix(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::NotAvailable => "not_available",
        }
    }
}

pub fn attendance_path(dir: &Path, vendor: &str, kind: Attendance) -> PathBuf {
    dir.join(format!("{}_{vendor}_tickers.json", kind.prefix()))
}

/// Read a log; an absent file is an empty log.
pub fn read_attendance(path: &Path) -> Result<Vec<Ticker>, DataError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

/// Append `tickers` to the log at `path`, skipping ones already listed.
/// Returns the full log as written.
pub fn append_attendance(path: &Path, tickers: &[Ticker]) -> Result<Vec<Ticker>, DataError> {
    let mut log = read_attendance(path)?;
    let mut seen: HashSet<Ticker> = log.iter().cloned().collect();
    log.extend(tickers.iter().filter(|t| seen.insert((*t).clone())).cloned());

    let json = serde_json::to_string_pretty(&log)?;
    write_atomic(path, |tmp| Ok(fs::write(tmp, json)?))?;
    Ok(log)
}

/// Update both logs for `vendor` in `dir`.
pub fn record_attendance(
    dir: &Path,
    vendor: &str,
    available: &[Ticker],
    not_available: &[Ticker],
) -> Result<(PathBuf, PathBuf), DataError> {
    let avail_path = attendance_path(dir, vendor, Attendance::Available);
    let missing_path = attendance_path(dir, vendor, Attendance::NotAvailable);
    append_attendance(&avail_path, available)?;
    append_attendance(&missing_path, not_available)?;
    Ok((avail_path, missing_path))
}
