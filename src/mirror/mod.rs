// SPDX-License-Identifier: MIT
//! Live local mirror of the remote collections.
//!
//! The mirror never originates a mutation. Each incoming notification
//! carries a full snapshot of one collection and replaces that collection's
//! local copy atomically; the other collections are untouched. Documents
//! that fail typed decoding are logged and dropped, so one bad remote write
//! cannot poison the derived views.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::model::{
    exercise_name, BodyWeightEntry, WorkoutLog, BODYWEIGHTS, EXERCISES, WORKOUTS,
};
use crate::store::{
    Direction, Notification, RecordStore, StoreError, SubscribeRequest, Subscription,
};

// ─── Collections ──────────────────────────────────────────────────────────────

/// The three logical collections the mirror tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Exercises,
    Workouts,
    BodyWeights,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Exercises => EXERCISES,
            Collection::Workouts => WORKOUTS,
            Collection::BodyWeights => BODYWEIGHTS,
        }
    }
}

// ─── Mirror state ─────────────────────────────────────────────────────────────

/// Typed snapshot of all mirrored collections.
///
/// `exercises` is a derived list: unique names, sorted ascending, so display
/// order is deterministic no matter how many duplicate creation documents the
/// store holds. `workouts` and `body_weights` keep store-delivered order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorState {
    pub exercises: Vec<String>,
    pub workouts: Vec<WorkoutLog>,
    pub body_weights: Vec<BodyWeightEntry>,
}

impl MirrorState {
    /// Replace one collection's local copy with a freshly delivered snapshot.
    pub fn apply(&mut self, collection: Collection, notification: &Notification) {
        let total = notification.snapshot.len();
        match collection {
            Collection::Exercises => {
                let unique: BTreeSet<String> = notification
                    .snapshot
                    .iter()
                    .filter_map(|doc| {
                        let name = exercise_name(doc);
                        if name.is_none() {
                            warn!(collection = EXERCISES, id = %doc.id, "document excluded from mirror");
                        }
                        name
                    })
                    .collect();
                self.exercises = unique.into_iter().collect();
            }
            Collection::Workouts => {
                self.workouts = notification
                    .snapshot
                    .iter()
                    .filter_map(|doc| {
                        let log = WorkoutLog::from_document(doc);
                        if log.is_none() {
                            warn!(collection = WORKOUTS, id = %doc.id, "document excluded from mirror");
                        }
                        log
                    })
                    .collect();
            }
            Collection::BodyWeights => {
                self.body_weights = notification
                    .snapshot
                    .iter()
                    .filter_map(|doc| {
                        let entry = BodyWeightEntry::from_document(doc);
                        if entry.is_none() {
                            warn!(collection = BODYWEIGHTS, id = %doc.id, "document excluded from mirror");
                        }
                        entry
                    })
                    .collect();
            }
        }
        debug!(collection = collection.name(), documents = total, "snapshot applied");
    }

    /// Whether a workout log with this id is present in the current snapshot.
    pub fn contains_workout(&self, id: &str) -> bool {
        self.workouts.iter().any(|log| log.id == id)
    }
}

// ─── Subscriptions ────────────────────────────────────────────────────────────

/// The live feeds backing a mirror, one per collection.
///
/// Dropping the bundle releases every store-side subscription; calling
/// [`unsubscribe_all`](Self::unsubscribe_all) first does the same release
/// eagerly and exactly once.
#[derive(Debug)]
pub struct MirrorSubscriptions {
    pub exercises: Subscription,
    pub workouts: Subscription,
    pub body_weights: Subscription,
}

impl MirrorSubscriptions {
    /// Subscribe to all three collections. Logs and body weights are ordered
    /// by their creation timestamp in the requested direction; the exercises
    /// feed is unordered because the mirror sorts names itself.
    pub async fn open<S: RecordStore + ?Sized>(
        store: &S,
        log_order: Direction,
    ) -> Result<Self, StoreError> {
        let exercises = store.subscribe(SubscribeRequest::new(EXERCISES)).await?;
        let workouts = store
            .subscribe(SubscribeRequest::new(WORKOUTS).ordered_by("created", log_order))
            .await?;
        let body_weights = store
            .subscribe(SubscribeRequest::new(BODYWEIGHTS).ordered_by("created", log_order))
            .await?;
        Ok(Self {
            exercises,
            workouts,
            body_weights,
        })
    }

    /// Release all three store-side subscriptions. Idempotent.
    pub fn unsubscribe_all(&mut self) {
        self.exercises.unsubscribe();
        self.workouts.unsubscribe();
        self.body_weights.unsubscribe();
    }
}
