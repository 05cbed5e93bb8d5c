//! CSV container: `{root}/{ticker}.csv` with header `date,open,high,low,close,volume`.

use std::fs;
use std::path::{Path, PathBuf};

use super::provider::DataError;
use super::store::{write_atomic, ContainerFormat, SeriesStore};
use crate::domain::{PricePoint, TickerSeries};

pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SeriesStore for CsvStore {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::Csv
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn write(&self, ticker: &str, series: &TickerSeries, _source: &str) -> Result<(), DataError> {
        write_atomic(&self.path_for(ticker), |tmp| {
            let mut wtr = csv::Writer::from_path(tmp)?;
            for point in &series.points {
                wtr.serialize(point)?;
            }
            wtr.flush()?;
            Ok(())
        })
    }

    fn load(&self, ticker: &str) -> Result<TickerSeries, DataError> {
        let path = self.path_for(ticker);
        if !path.is_file() {
            return Err(DataError::NotStored {
                ticker: ticker.to_string(),
            });
        }
        let mut rdr = csv::Reader::from_reader(fs::File::open(&path)?);
        let points = rdr
            .deserialize::<PricePoint>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TickerSeries::new(ticker, points))
    }
}
