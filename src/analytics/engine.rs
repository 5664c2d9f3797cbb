// SPDX-License-Identifier: MIT
//! The recompute engine. Every function is a pure read of the snapshot.
//!
//! Window arithmetic uses real calendar operations from `chrono`: `Monthly`
//! subtracts one calendar month, and the weekly summary groups by
//! [`chrono::IsoWeek`] rather than comparing date-string prefixes, which
//! would split a week spanning a year boundary.

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use std::collections::BTreeSet;

use super::model::{
    AnalyticsParams, AnalyticsView, DailyVolume, ExerciseSeries, PersonalRecord, RankingMetric,
    SeriesPoint, TimeRange, WeeklySummary,
};
use crate::mirror::MirrorState;
use crate::model::{BodyWeightEntry, WorkoutLog};

/// Label format for workout series points, e.g. `"Aug 1 - 10:30"`.
const POINT_LABEL: &str = "%b %-d - %H:%M";
/// Label format for body-weight points, e.g. `"Aug 1"`.
const DAY_LABEL: &str = "%b %-d";

// ─── Composite ────────────────────────────────────────────────────────────────

/// Derive the full analytics view from one mirror snapshot.
///
/// Deterministic in `(state, params, now)`: calling it twice with the same
/// inputs yields an identical view.
pub fn compute(state: &MirrorState, params: &AnalyticsParams, now: DateTime<Utc>) -> AnalyticsView {
    let logs = &state.workouts;
    AnalyticsView {
        records: all_records(logs, params.metric),
        selected: params.selected.as_deref().map(|name| ExerciseSeries {
            name: name.to_string(),
            points: series(logs, name, params.range, now),
            personal_record: personal_record(logs, name, params.metric),
        }),
        daily: daily_grouping(logs, params.sort_days),
        weekly: weekly_summary(logs, now),
        body_weight: body_weight_series(&state.body_weights),
    }
}

// ─── Personal records ─────────────────────────────────────────────────────────

/// Maximum observed ranking value for one exercise, 0.0 when it has no logs.
pub fn personal_record(logs: &[WorkoutLog], name: &str, metric: RankingMetric) -> f64 {
    logs.iter()
        .filter(|log| log.name == name)
        .map(|log| ranking_value(metric, log))
        .fold(0.0, f64::max)
}

fn ranking_value(metric: RankingMetric, log: &WorkoutLog) -> f64 {
    match metric {
        RankingMetric::MaxWeight => log.weight,
        RankingMetric::MaxSetVolume => log.volume(),
    }
}

fn all_records(logs: &[WorkoutLog], metric: RankingMetric) -> Vec<PersonalRecord> {
    let mut records: Vec<PersonalRecord> = Vec::new();
    for log in logs {
        let value = ranking_value(metric, log);
        match records.iter_mut().find(|record| record.name == log.name) {
            Some(record) => record.value = record.value.max(value),
            None => records.push(PersonalRecord {
                name: log.name.clone(),
                value,
            }),
        }
    }
    records
}

// ─── Windowing ────────────────────────────────────────────────────────────────

fn cutoff(range: TimeRange, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match range {
        TimeRange::All => None,
        TimeRange::Weekly => Some(now - Duration::days(7)),
        // Calendar-month subtraction; a clamp at a month boundary (e.g.
        // Mar 31 − 1 month) lands on the last valid preceding day.
        TimeRange::Monthly => now.checked_sub_months(Months::new(1)),
    }
}

/// Logs for one exercise whose `created` falls inside the window. Entries
/// exactly on the cutoff are in; there is no upper bound.
pub fn window_filter<'a>(
    logs: &'a [WorkoutLog],
    name: &str,
    range: TimeRange,
    now: DateTime<Utc>,
) -> Vec<&'a WorkoutLog> {
    let floor = cutoff(range, now);
    logs.iter()
        .filter(|log| log.name == name)
        .filter(|log| floor.is_none_or(|floor| log.created >= floor))
        .collect()
}

// ─── Series ───────────────────────────────────────────────────────────────────

/// Windowed per-entry series for one exercise, one point per log, in
/// snapshot order. Point value is the log's `sets × weight`.
pub fn series(
    logs: &[WorkoutLog],
    name: &str,
    range: TimeRange,
    now: DateTime<Utc>,
) -> Vec<SeriesPoint> {
    window_filter(logs, name, range, now)
        .into_iter()
        .map(|log| SeriesPoint {
            label: log.created.format(POINT_LABEL).to_string(),
            value: log.volume(),
        })
        .collect()
}

/// Body-weight history, one point per entry, in snapshot order.
pub fn body_weight_series(entries: &[BodyWeightEntry]) -> Vec<SeriesPoint> {
    entries
        .iter()
        .map(|entry| SeriesPoint {
            label: entry.created.format(DAY_LABEL).to_string(),
            value: entry.weight,
        })
        .collect()
}

// ─── Daily grouping ───────────────────────────────────────────────────────────

/// Volume per (UTC calendar day, exercise) pair. Output follows the order
/// pairs first appear in the input unless `sort_days` requests date order.
pub fn daily_grouping(logs: &[WorkoutLog], sort_days: bool) -> Vec<DailyVolume> {
    let mut grouped: Vec<DailyVolume> = Vec::new();
    for log in logs {
        let date = log.created.format("%Y-%m-%d").to_string();
        match grouped
            .iter_mut()
            .find(|entry| entry.date == date && entry.name == log.name)
        {
            Some(entry) => entry.volume += log.volume(),
            None => grouped.push(DailyVolume {
                date,
                name: log.name.clone(),
                volume: log.volume(),
            }),
        }
    }
    if sort_days {
        grouped.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
    }
    grouped
}

// ─── Weekly summary ───────────────────────────────────────────────────────────

/// Current ISO-week volume and workout-day count, plus the all-time
/// most-frequent exercise.
pub fn weekly_summary(logs: &[WorkoutLog], now: DateTime<Utc>) -> WeeklySummary {
    let this_week = now.iso_week();
    let mut volume = 0.0;
    let mut days = BTreeSet::new();
    for log in logs {
        if log.created.iso_week() == this_week {
            volume += log.volume();
            days.insert(log.created.date_naive());
        }
    }

    let mut counts: Vec<(&str, u32)> = Vec::new();
    for log in logs {
        match counts.iter_mut().find(|(name, _)| *name == log.name) {
            Some((_, count)) => *count += 1,
            None => counts.push((&log.name, 1)),
        }
    }
    // Strict comparison keeps the first-encountered name on ties.
    let mut most_frequent: Option<(&str, u32)> = None;
    for (name, count) in counts {
        if most_frequent.is_none_or(|(_, best)| count > best) {
            most_frequent = Some((name, count));
        }
    }

    WeeklySummary {
        volume,
        workout_count: days.len() as u32,
        most_frequent: most_frequent.map(|(name, _)| name.to_string()),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
