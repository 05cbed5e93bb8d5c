//! Membership filter: keep only gaps that fall inside a membership interval.
//!
//! A date absent from a stored series is only a genuine gap if the ticker was
//! an index member on that date. Dates between intervals (before joining,
//! after leaving, or between a leave and a rejoin) are dropped here.

use rayon::prelude::*;
use std::collections::BTreeSet;

use super::MissingDates;
use crate::membership::MembershipTimeline;

/// Intersect each ticker's raw gaps with its membership intervals.
///
/// Tickers whose filtered set is empty are not in the result. Tickers absent
/// from the timeline have no intervals and therefore no true gaps.
pub fn filter_to_membership(missing: &MissingDates, timeline: &MembershipTimeline) -> MissingDates {
    missing
        .par_iter()
        .filter_map(|(ticker, dates)| {
            let mut kept = BTreeSet::new();
            for interval in timeline.intervals_for(ticker) {
                kept.extend(dates.range(interval.start..=interval.end).copied());
            }
            (!kept.is_empty()).then(|| (ticker.clone(), kept))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}
