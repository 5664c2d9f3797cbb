//! Analytics data models — serialisable view types produced by the engine.

use serde::{Deserialize, Serialize};

// ─── Parameters ───────────────────────────────────────────────────────────────

/// Time window applied to per-exercise series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    /// Entries created within the last 7 days.
    #[default]
    Weekly,
    /// Entries created within the last calendar month.
    Monthly,
    /// No lower bound.
    All,
}

/// Which observed value a personal record ranks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RankingMetric {
    /// Heaviest single weight ever logged for the exercise.
    #[default]
    #[serde(rename = "max-weight")]
    MaxWeight,
    /// Largest `sets × weight` of any single log entry.
    #[serde(rename = "set-volume")]
    MaxSetVolume,
}

/// Inputs that shape one analytics recomputation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsParams {
    /// Exercise the focused series is computed for. `None` means no focus.
    pub selected: Option<String>,

    /// Window applied to the focused series.
    pub range: TimeRange,

    /// Personal-record ranking metric.
    pub metric: RankingMetric,

    /// Sort daily grouping output by date instead of first-appearance order.
    pub sort_days: bool,
}

// ─── Series ───────────────────────────────────────────────────────────────────

/// One plottable point handed to the charting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Display label, e.g. `"Aug 1 - 10:30"` for workout points or
    /// `"Aug 1"` for body-weight points.
    pub label: String,

    /// The plotted value (volume or body weight).
    pub value: f64,
}

/// Windowed series plus the all-time record for one exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSeries {
    /// The exercise the series belongs to.
    pub name: String,

    /// One point per in-window log, in snapshot order.
    pub points: Vec<SeriesPoint>,

    /// All-time personal record under the configured metric.
    pub personal_record: f64,
}

// ─── Aggregates ───────────────────────────────────────────────────────────────

/// All-time best for a single exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecord {
    /// Exercise name.
    pub name: String,

    /// Maximum observed ranking-metric value, 0.0 when no entries exist.
    pub value: f64,
}

/// Training volume for one exercise on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyVolume {
    /// ISO 8601 calendar date, e.g. `"2026-08-01"`.
    pub date: String,

    /// Exercise name.
    pub name: String,

    /// Sum of `sets × weight` for that exercise on that day.
    pub volume: f64,
}

/// Summary of the current ISO week plus the all-time frequency leader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    /// Total `sets × weight` across all logs in the current ISO week.
    pub volume: f64,

    /// Distinct calendar days with at least one log in the current ISO week.
    pub workout_count: u32,

    /// Exercise with the highest all-time entry count. Ties go to the name
    /// encountered first in snapshot order. `None` when no logs exist.
    pub most_frequent: Option<String>,
}

// ─── Composite view ───────────────────────────────────────────────────────────

/// Everything the engine derives from one mirror snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsView {
    /// All-time personal record per exercise, in first-appearance order.
    pub records: Vec<PersonalRecord>,

    /// Focused series for the selected exercise, if one is selected.
    pub selected: Option<ExerciseSeries>,

    /// Per-day, per-exercise volume grouping.
    pub daily: Vec<DailyVolume>,

    /// Current ISO-week summary.
    pub weekly: WeeklySummary,

    /// Body-weight history points.
    pub body_weight: Vec<SeriesPoint>,
}

// ─── Tests ────────────────────────────────────────────────────────────────────
