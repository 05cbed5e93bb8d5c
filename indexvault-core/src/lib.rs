//! IndexVault Core: membership timeline, gap detection, backfill reconciliation.
//!
//! This crate contains the dataset-building logic for a historical index universe:
//! - Domain types (membership records and intervals, price points, vendor results)
//! - Membership history loading and the run-length membership timeline
//! - Calendar diff and membership filter producing the true-missing report
//! - Backfill reconciliation, series merge and the ordinance check
//! - Vendor providers (Yahoo, IEX, synthetic) and CSV / Parquet containers

pub mod analysis;
pub mod data;
pub mod domain;
pub mod membership;
pub mod reconcile;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types shared across rayon workers are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::MembershipRecord>();
        require_sync::<domain::MembershipRecord>();
        require_send::<domain::MembershipInterval>();
        require_sync::<domain::MembershipInterval>();
        require_send::<domain::TickerSeries>();
        require_sync::<domain::TickerSeries>();
        require_send::<domain::VendorFetchResult>();
        require_sync::<domain::VendorFetchResult>();

        // Pipeline state
        require_send::<membership::MembershipTimeline>();
        require_sync::<membership::MembershipTimeline>();
        require_send::<reconcile::Reconciliation>();
        require_sync::<reconcile::Reconciliation>();
        require_send::<reconcile::BackfillLedger>();
        require_sync::<reconcile::BackfillLedger>();

        // Collaborators
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::IexProvider>();
        require_sync::<data::IexProvider>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::ParquetStore>();
        require_sync::<data::ParquetStore>();
    }

    /// Architecture contract: reconciliation never touches a provider or store.
    ///
    /// `reconcile` takes the missing report and an already-fetched batch by
    /// reference. If a signature change pulls I/O into the core, this breaks.
    #[test]
    fn reconcile_is_pure_over_fetched_data() {
        fn _check(
            missing: &reconcile::MissingDates,
            batch: &domain::VendorBatch,
        ) -> Result<reconcile::Reconciliation, reconcile::ReconcileError> {
            reconcile::reconcile(missing, batch)
        }
    }
}
