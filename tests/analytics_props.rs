//! Property tests for the analytics engine: laws that must hold for any
//! mirror snapshot, not just the handpicked fixtures in the unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use liftsync::analytics::engine::{daily_grouping, personal_record, window_filter};
use liftsync::analytics::{compute, AnalyticsParams, RankingMetric, TimeRange};
use liftsync::mirror::MirrorState;
use liftsync::model::WorkoutLog;
use proptest::prelude::*;

/// Fixed reference instant so windows are deterministic across runs.
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 20, 12, 0, 0).unwrap()
}

const NAMES: [&str; 4] = ["Squat", "Bench Press", "Deadlift", "Overhead Press"];

fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(NAMES[0].to_string()),
        Just(NAMES[1].to_string()),
        Just(NAMES[2].to_string()),
        Just(NAMES[3].to_string()),
    ]
}

fn arb_log() -> impl Strategy<Value = WorkoutLog> {
    (
        any::<u32>(),
        arb_name(),
        1u32..=12,
        0.0f64..300.0,
        0i64..90,
        0i64..24,
    )
        .prop_map(|(n, name, sets, weight, days_back, hour)| WorkoutLog {
            id: format!("log-{n}"),
            name,
            sets,
            weight,
            created: now() - Duration::days(days_back) - Duration::hours(hour),
        })
}

fn arb_logs() -> impl Strategy<Value = Vec<WorkoutLog>> {
    prop::collection::vec(arb_log(), 0..40)
}

fn arb_range() -> impl Strategy<Value = TimeRange> {
    prop_oneof![
        Just(TimeRange::Weekly),
        Just(TimeRange::Monthly),
        Just(TimeRange::All),
    ]
}

fn arb_metric() -> impl Strategy<Value = RankingMetric> {
    prop_oneof![
        Just(RankingMetric::MaxWeight),
        Just(RankingMetric::MaxSetVolume),
    ]
}

fn metric_value(metric: RankingMetric, log: &WorkoutLog) -> f64 {
    match metric {
        RankingMetric::MaxWeight => log.weight,
        RankingMetric::MaxSetVolume => log.volume(),
    }
}

proptest! {
    /// The personal record is exactly the maximum ranking value over that
    /// exercise's logs, and therefore at least every individual entry.
    #[test]
    fn personal_record_is_the_maximum(logs in arb_logs(), metric in arb_metric()) {
        for name in NAMES {
            let expected = logs
                .iter()
                .filter(|log| log.name == name)
                .map(|log| metric_value(metric, log))
                .fold(0.0, f64::max);
            let record = personal_record(&logs, name, metric);
            prop_assert_eq!(record, expected);
            for log in logs.iter().filter(|log| log.name == name) {
                prop_assert!(record >= metric_value(metric, log));
            }
        }
    }

    /// Grouping by day conserves total volume: nothing is dropped or counted
    /// twice.
    #[test]
    fn daily_grouping_conserves_volume(logs in arb_logs(), sort_days in any::<bool>()) {
        let total: f64 = logs.iter().map(WorkoutLog::volume).sum();
        let grouped: f64 = daily_grouping(&logs, sort_days).iter().map(|d| d.volume).sum();
        prop_assert!((total - grouped).abs() < 1e-6, "total {total} vs grouped {grouped}");
    }

    /// Sorted and unsorted daily grouping hold the same entries.
    #[test]
    fn daily_grouping_sort_only_reorders(logs in arb_logs()) {
        let mut unsorted = daily_grouping(&logs, false);
        let sorted = daily_grouping(&logs, true);
        unsorted.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
        prop_assert_eq!(unsorted, sorted);
    }

    /// Narrower windows never contain a log the wider ones miss.
    #[test]
    fn windows_nest(logs in arb_logs(), name in arb_name()) {
        let all = window_filter(&logs, &name, TimeRange::All, now());
        let monthly = window_filter(&logs, &name, TimeRange::Monthly, now());
        let weekly = window_filter(&logs, &name, TimeRange::Weekly, now());

        let contains = |wide: &[&WorkoutLog], narrow: &[&WorkoutLog]| {
            narrow.iter().all(|log| wide.iter().any(|other| other.id == log.id))
        };
        prop_assert!(contains(&all, &monthly));
        prop_assert!(contains(&monthly, &weekly));
    }

    /// Recomputing over the same snapshot is pure: identical output, no
    /// accumulated state.
    #[test]
    fn compute_is_deterministic(
        logs in arb_logs(),
        selected in prop::option::of(arb_name()),
        range in arb_range(),
        metric in arb_metric(),
        sort_days in any::<bool>(),
    ) {
        let state = MirrorState {
            exercises: NAMES.iter().map(|name| name.to_string()).collect(),
            workouts: logs,
            body_weights: Vec::new(),
        };
        let params = AnalyticsParams { selected, range, metric, sort_days };
        prop_assert_eq!(
            compute(&state, &params, now()),
            compute(&state, &params, now())
        );
    }
}
