//! Property tests for the reconciliation laws.
//!
//! Uses proptest to verify:
//! 1. Interval coverage: intervals cover exactly the records listing a ticker
//! 2. Calendar diff: `missing(S, F) == F − S` and is disjoint from S
//! 3. Membership filter: result ⊆ input and every date lies in an interval
//! 4. Reconcile: idempotent, reductions bounded by the input
//! 5. Merge: primary precedence, sorted output accepted by the ordinance check

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::BTreeSet;

use indexvault_core::domain::{
    MembershipRecord, PricePoint, TickerSeries, VendorBatch, VendorFetchResult, VendorFieldError,
};
use indexvault_core::membership::MembershipTimeline;
use indexvault_core::reconcile::{
    filter_to_membership, is_ordered, merge_series, missing_dates, reconcile, MissingDates,
};

const UNIVERSE: [&str; 4] = ["A", "B", "C", "D"];

// ── Strategies (proptest) ────────────────────────────────────────────

fn day(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(offset as i64)
}

fn arb_dates() -> impl Strategy<Value = BTreeSet<NaiveDate>> {
    prop::collection::btree_set((0u32..60).prop_map(day), 0..40)
}

/// Membership records on strictly increasing dates, each listing a subset of UNIVERSE.
fn arb_records() -> impl Strategy<Value = Vec<MembershipRecord>> {
    prop::collection::vec(prop::collection::vec(any::<bool>(), UNIVERSE.len()), 0..12).prop_map(
        |masks| {
            masks
                .iter()
                .enumerate()
                .map(|(i, mask)| {
                    let symbols = UNIVERSE
                        .iter()
                        .zip(mask)
                        .filter(|(_, present)| **present)
                        .map(|(t, _)| *t);
                    MembershipRecord::new(day(i as u32 * 5), symbols).unwrap()
                })
                .collect()
        },
    )
}

fn arb_missing() -> impl Strategy<Value = MissingDates> {
    prop::collection::vec(arb_dates(), UNIVERSE.len()).prop_map(|sets| {
        UNIVERSE
            .iter()
            .zip(sets)
            .map(|(t, s)| (t.to_string(), s))
            .collect()
    })
}

fn point(date: NaiveDate, open: f64) -> PricePoint {
    PricePoint {
        date,
        open,
        high: open,
        low: open,
        close: open,
        volume: 1,
    }
}

fn series_from(ticker: &str, dates: &BTreeSet<NaiveDate>, open: f64) -> TickerSeries {
    TickerSeries::new(ticker, dates.iter().map(|&d| point(d, open)).collect())
}

/// A vendor batch over a subset of UNIVERSE: fragments with some errored dates.
fn arb_vendor() -> impl Strategy<Value = VendorBatch> {
    prop::collection::vec((any::<bool>(), arb_dates(), arb_dates()), UNIVERSE.len()).prop_map(
        |entries| {
            UNIVERSE
                .iter()
                .zip(entries)
                .filter(|(_, (returned, _, _))| *returned)
                .map(|(t, (_, dates, errored))| {
                    let errors = errored
                        .iter()
                        .map(|&date| VendorFieldError {
                            ticker: t.to_string(),
                            date,
                            detail: "missing field fClose".into(),
                        })
                        .collect();
                    (
                        t.to_string(),
                        VendorFetchResult::from_parts(series_from(t, &dates, 1.0), errors),
                    )
                })
                .collect()
        },
    )
}

// ── 1. Interval coverage ─────────────────────────────────────────────

proptest! {
    #[test]
    fn intervals_cover_exactly_present_records(records in arb_records()) {
        let timeline = MembershipTimeline::build(&records).unwrap();
        for ticker in UNIVERSE {
            let present = records.iter().filter(|r| r.contains(ticker)).count();
            let intervals = timeline.intervals_for(ticker);
            let covered: usize = intervals.iter().map(|i| i.observations).sum();
            prop_assert_eq!(covered, present);

            for i in intervals {
                prop_assert!(i.start <= i.end);
            }
            for pair in intervals.windows(2) {
                prop_assert!(pair[0].end < pair[1].start);
            }
            // every record date is inside an interval iff the ticker is listed
            for r in &records {
                prop_assert_eq!(timeline.is_member(ticker, r.as_of), r.contains(ticker));
            }
        }
    }
}

// ── 2. Calendar diff ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn calendar_diff_is_set_difference(stored in arb_dates(), full in arb_dates()) {
        let full_range: Vec<NaiveDate> = full.iter().copied().collect();
        let missing = missing_dates(&stored, &full_range);
        let expected: BTreeSet<NaiveDate> = full.difference(&stored).copied().collect();
        prop_assert_eq!(&missing, &expected);
        prop_assert!(missing.is_disjoint(&stored));
    }
}

// ── 3. Membership filter ─────────────────────────────────────────────

proptest! {
    #[test]
    fn filter_is_subset_inside_intervals(records in arb_records(), missing in arb_missing()) {
        let timeline = MembershipTimeline::build(&records).unwrap();
        let filtered = filter_to_membership(&missing, &timeline);
        for (ticker, dates) in &filtered {
            prop_assert!(!dates.is_empty());
            prop_assert!(dates.is_subset(&missing[ticker]));
            for d in dates {
                prop_assert!(timeline.is_member(ticker, *d));
            }
        }
    }
}

// ── 4. Reconcile ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn reconcile_idempotent_and_bounded(missing in arb_missing(), vendor in arb_vendor()) {
        let first = reconcile(&missing, &vendor).unwrap();
        let second = reconcile(&missing, &vendor).unwrap();
        prop_assert_eq!(&first, &second);

        for (ticker, counts) in &first.report.per_ticker {
            prop_assert!(counts.reduced <= missing[ticker].len());
            prop_assert_eq!(counts.before, counts.reduced + counts.still_missing);
            prop_assert!(first.still_missing[ticker].is_subset(&missing[ticker]));
        }
        prop_assert!(first.report.not_available.is_subset(&first.report.incomplete));
        prop_assert_eq!(
            first.report.filled.len() + first.report.incomplete.len(),
            missing.len()
        );
    }
}

// ── 5. Merge ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_prefers_primary_and_orders(p in arb_dates(), q in arb_dates()) {
        let primary = series_from("A", &p, 1.0);
        let secondary = series_from("A", &q, 2.0);
        let merged = merge_series(&primary, &secondary).unwrap();

        prop_assert!(is_ordered(&merged));
        let union: BTreeSet<NaiveDate> = p.union(&q).copied().collect();
        prop_assert_eq!(merged.len(), union.len());
        for pt in &merged.points {
            let expected = if p.contains(&pt.date) { 1.0 } else { 2.0 };
            prop_assert_eq!(pt.open, expected);
        }
        if p.is_disjoint(&q) {
            prop_assert_eq!(merged.len(), p.len() + q.len());
        }
    }
}

#[test]
fn duplicate_dates_fail_ordinance() {
    let d = day(0);
    let s = TickerSeries::new("A", vec![point(d, 1.0), point(d, 1.0)]);
    assert!(!is_ordered(&s));
}
