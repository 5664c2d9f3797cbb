//! Derived analytics over the mirror snapshot.
//!
//! Everything in here is a pure function of `(snapshot, params, now)`; no
//! stored state, no side effects, so recomputing on every mirror change
//! cannot accumulate error.

pub mod engine;
pub mod model;

pub use engine::compute;
pub use model::{
    AnalyticsParams, AnalyticsView, DailyVolume, ExerciseSeries, PersonalRecord, RankingMetric,
    SeriesPoint, TimeRange, WeeklySummary,
};
