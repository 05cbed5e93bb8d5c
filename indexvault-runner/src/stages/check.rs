//! `check`: run the ordinance check over every stored series.

use std::path::PathBuf;
use tracing::info;

use indexvault_core::data::open_store;
use indexvault_core::domain::Ticker;
use indexvault_core::reconcile::check_all;

use super::{load_history, universe_with_reference, StageError};
use crate::config::PipelineConfig;

/// Which store to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckTarget {
    Data,
    #[default]
    Merged,
}

#[derive(Debug)]
pub struct CheckOutcome {
    pub dir: PathBuf,
    pub checked: usize,
    /// Universe tickers with no container in the checked store.
    pub absent: Vec<Ticker>,
}

/// Fails with the first ordinance violation found, in ticker order.
pub fn run_check(config: &PipelineConfig, target: CheckTarget) -> Result<CheckOutcome, StageError> {
    let history = load_history(config)?;
    let tickers = universe_with_reference(&history, &config.gaps.reference_ticker);
    let dir = match target {
        CheckTarget::Data => config.paths.data_dir.clone(),
        CheckTarget::Merged => config.paths.merged_dir.clone(),
    };
    let store = open_store(config.storage.format, &dir);

    let loaded = store.load_many(&tickers)?;
    let checked = check_all(loaded.loaded.values())?;
    info!(dir = %dir.display(), checked, absent = loaded.missing.len(), "ordinance check passed");

    Ok(CheckOutcome {
        dir,
        checked,
        absent: loaded.missing,
    })
}
