//! Container abstraction: one stored series per ticker in a directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::csv_store::CsvStore;
use super::parquet_store::ParquetStore;
use super::provider::DataError;
use crate::domain::{Ticker, TickerSeries};

/// On-disk container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Csv,
    #[default]
    Parquet,
}

impl ContainerFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ContainerFormat {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            other => Err(DataError::Storage(format!("unknown container format '{other}'"))),
        }
    }
}

/// Tickers split by whether a container exists for them.
#[derive(Debug, Default)]
pub struct LoadedSeries {
    pub loaded: BTreeMap<Ticker, TickerSeries>,
    pub missing: Vec<Ticker>,
}

/// Persistence collaborator. Writes replace whatever was stored before.
pub trait SeriesStore: Send + Sync {
    fn format(&self) -> ContainerFormat;

    fn root(&self) -> &Path;

    /// Store `series` under `ticker`, atomically.
    fn write(&self, ticker: &str, series: &TickerSeries, source: &str) -> Result<(), DataError>;

    /// Load the stored series. Rows come back in file order.
    fn load(&self, ticker: &str) -> Result<TickerSeries, DataError>;

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.root().join(format!("{ticker}.{}", self.format().extension()))
    }

    fn contains(&self, ticker: &str) -> bool {
        self.path_for(ticker).is_file()
    }

    /// Load each ticker; tickers with no container go to `missing`.
    fn load_many(&self, tickers: &[Ticker]) -> Result<LoadedSeries, DataError> {
        let mut out = LoadedSeries::default();
        for ticker in tickers {
            match self.load(ticker) {
                Ok(series) => {
                    out.loaded.insert(ticker.clone(), series);
                }
                Err(DataError::NotStored { .. }) => out.missing.push(ticker.clone()),
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}

/// Open a store of the given format rooted at `root`.
pub fn open_store(format: ContainerFormat, root: impl Into<PathBuf>) -> Box<dyn SeriesStore> {
    match format {
        ContainerFormat::Csv => Box::new(CsvStore::new(root)),
        ContainerFormat::Parquet => Box::new(ParquetStore::new(root)),
    }
}

/// Tickers whose container file is absent, in input order.
pub fn verify_saved(store: &dyn SeriesStore, tickers: &[Ticker]) -> Vec<Ticker> {
    tickers
        .iter()
        .filter(|t| !store.contains(t))
        .cloned()
        .collect()
}

/// Run `write` against a sibling `.tmp` path, then rename it onto `path`.
pub(crate) fn write_atomic(path: &Path, write: impl FnOnce(&Path) -> Result<(), DataError>) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = write(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        DataError::Storage(format!("atomic rename failed for {}: {e}", path.display()))
    })
}
