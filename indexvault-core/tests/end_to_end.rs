//! End-to-end: membership CSV → gaps → backfill → merge → ordinance → store.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use indexvault_core::data::{
    open_store, ContainerFormat, SeriesStore, SyntheticProvider, VendorProvider,
};
use indexvault_core::domain::{PricePoint, Ticker, TickerSeries};
use indexvault_core::membership::{parse_membership_csv, MembershipTimeline};
use indexvault_core::reconcile::{
    check_all, filter_to_membership, merge_all, missing_by_ticker, reconcile,
    still_missing_for_json, total_dates, BackfillLedger, MissingDates,
};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn dates(ds: &[&str]) -> BTreeSet<NaiveDate> {
    ds.iter().map(|s| d(s)).collect()
}

fn series(ticker: &str, ds: &[&str]) -> TickerSeries {
    TickerSeries::new(
        ticker,
        ds.iter()
            .map(|s| PricePoint {
                date: d(s),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.5,
                volume: 100,
            })
            .collect(),
    )
}

#[test]
fn documented_two_record_scenario() {
    let csv = "date,tickers\n2015-01-01,\"A,B\"\n2016-01-01,\"B,C\"\n";
    let history = parse_membership_csv(csv.as_bytes()).unwrap();
    let timeline = history.timeline().unwrap();

    let span = |t: &str| {
        timeline
            .intervals_for(t)
            .iter()
            .map(|i| (i.start, i.end))
            .collect::<Vec<_>>()
    };
    assert_eq!(span("A"), vec![(d("2015-01-01"), d("2015-01-01"))]);
    assert_eq!(span("B"), vec![(d("2015-01-01"), d("2016-01-01"))]);
    assert_eq!(span("C"), vec![(d("2016-01-01"), d("2016-01-01"))]);

    let full_range = vec![d("2015-01-01"), d("2015-06-01"), d("2016-01-01")];
    let mut stored = BTreeMap::new();
    stored.insert("A".to_string(), TickerSeries::empty("A"));

    let raw = missing_by_ticker(&stored, &full_range);
    assert_eq!(raw["A"].len(), 3);

    let true_missing = filter_to_membership(&raw, &timeline);
    assert_eq!(true_missing["A"], dates(&["2015-01-01"]));
}

#[test]
fn backfill_merge_and_store() {
    let csv = "date,tickers\n2024-01-01,\"AAA,BBB,CCC\"\n2024-01-31,\"AAA,BBB\"\n";
    let timeline: MembershipTimeline = parse_membership_csv(csv.as_bytes())
        .unwrap()
        .timeline()
        .unwrap();

    // Weekdays 2024-01-08 .. 2024-01-12 as the expected calendar.
    let calendar: Vec<NaiveDate> = (8..=12)
        .map(|day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap())
        .collect();

    let mut primary: BTreeMap<Ticker, TickerSeries> = BTreeMap::new();
    primary.insert("AAA".into(), series("AAA", &["2024-01-08", "2024-01-09", "2024-01-10", "2024-01-11", "2024-01-12"]));
    primary.insert("BBB".into(), series("BBB", &["2024-01-08", "2024-01-12"]));
    primary.insert("CCC".into(), series("CCC", &["2024-01-08"]));

    let raw = missing_by_ticker(&primary, &calendar);
    let true_missing: MissingDates = filter_to_membership(&raw, &timeline);
    // CCC left after 2024-01-01, so none of its January gaps count
    assert_eq!(true_missing.keys().collect::<Vec<_>>(), vec!["BBB"]);
    assert_eq!(total_dates(&true_missing), 3);

    // Secondary vendor has a hole on 2024-01-10.
    let vendor = SyntheticProvider::new().with_holes([d("2024-01-10")]);
    let requested: Vec<Ticker> = true_missing.keys().cloned().collect();
    let batch = vendor
        .fetch_batch(&requested, calendar[0], calendar[calendar.len() - 1])
        .unwrap();

    let rec = reconcile(&true_missing, &batch).unwrap();
    assert_eq!(rec.still_missing["BBB"], dates(&["2024-01-10"]));
    assert_eq!(rec.report.total_reduced, 2);
    assert!(rec.report.incomplete.contains("BBB"));

    let mut ledger = BackfillLedger::new();
    ledger.record(vendor.name(), &rec.report);
    assert_eq!(ledger.outstanding(), Some(1));

    let remaining = still_missing_for_json(&rec.still_missing, &rec.report.filled);
    assert_eq!(remaining.len(), 1);

    let secondary: BTreeMap<Ticker, TickerSeries> = batch
        .into_iter()
        .filter_map(|(t, r)| r.into_series().map(|s| (t, s)))
        .collect();
    let merged = merge_all(&primary, &secondary).unwrap();
    assert_eq!(check_all(merged.values()).unwrap(), 3);

    // primary values survive on shared dates
    assert_eq!(merged["BBB"].points[0].open, 10.0);
    assert_eq!(merged["BBB"].len(), 4);

    let dir = tempfile::tempdir().unwrap();
    let store = open_store(ContainerFormat::Csv, dir.path());
    for (ticker, s) in &merged {
        store.write(ticker, s, "merged").unwrap();
    }
    assert_eq!(store.load("BBB").unwrap(), merged["BBB"]);
}
