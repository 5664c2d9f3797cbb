//! Chart-facing boundary. Returns plain series data; rendering lives with
//! the collaborator on the other side.

use chrono::Utc;
use tokio::sync::watch;

use crate::analytics::{engine, SeriesPoint, TimeRange, WeeklySummary};
use crate::client::TrackerView;

/// Read-only projection over the client's published view.
pub struct ChartProjection {
    view: watch::Receiver<TrackerView>,
}

impl ChartProjection {
    pub fn new(view: watch::Receiver<TrackerView>) -> Self {
        Self { view }
    }

    /// Windowed series for one exercise, recomputed from the latest
    /// published snapshot. Any exercise can be asked for, not just the
    /// client's focused one.
    pub fn series(&self, exercise: &str, range: TimeRange) -> Vec<SeriesPoint> {
        let view = self.view.borrow();
        engine::series(&view.snapshot.workouts, exercise, range, Utc::now())
    }

    /// The current ISO-week summary from the latest published view.
    pub fn weekly_summary(&self) -> WeeklySummary {
        self.view.borrow().analytics.weekly.clone()
    }

    /// Body-weight history points from the latest published view.
    pub fn body_weight_series(&self) -> Vec<SeriesPoint> {
        self.view.borrow().analytics.body_weight.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{compute, AnalyticsParams};
    use crate::client::SyncStatus;
    use crate::edit::EditState;
    use crate::mirror::MirrorState;
    use crate::model::WorkoutLog;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn view_with_one_squat() -> TrackerView {
        let state = MirrorState {
            exercises: vec!["Squat".to_string()],
            workouts: vec![WorkoutLog {
                id: "w1".to_string(),
                name: "Squat".to_string(),
                sets: 5,
                weight: 100.0,
                created: Utc.with_ymd_and_hms(2026, 8, 20, 10, 0, 0).unwrap(),
            }],
            body_weights: vec![],
        };
        TrackerView {
            analytics: compute(&state, &AnalyticsParams::default(), Utc::now()),
            snapshot: Arc::new(state),
            edit: EditState::Idle,
            sync: SyncStatus::Live,
        }
    }

    #[test]
    fn series_reads_the_latest_snapshot() {
        let (tx, rx) = watch::channel(TrackerView::default());
        let projection = ChartProjection::new(rx);
        assert!(projection.series("Squat", TimeRange::All).is_empty());

        tx.send_replace(view_with_one_squat());
        let points = projection.series("Squat", TimeRange::All);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 500.0);
    }

    #[test]
    fn summary_comes_from_published_analytics() {
        let (tx, rx) = watch::channel(TrackerView::default());
        tx.send_replace(view_with_one_squat());
        let projection = ChartProjection::new(rx);
        assert_eq!(
            projection.weekly_summary().most_frequent.as_deref(),
            Some("Squat")
        );
        assert!(projection.body_weight_series().is_empty());
    }
}
