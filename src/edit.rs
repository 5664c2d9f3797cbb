// SPDX-License-Identifier: MIT
//! Edit/delete reconciliation — at most one record under edit at a time.
//!
//! The reconciler never mutates mirror state. It validates form input,
//! issues store intents, and advances its own state machine only after the
//! store confirms the call (no optimistic transition). Every visible data
//! change still arrives through the mirror's notification path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::mirror::MirrorState;
use crate::model::{
    body_weight_fields, exercise_fields, workout_fields, WorkoutLog, BODYWEIGHTS, EXERCISES,
    WORKOUTS,
};
use crate::store::{RecordStore, StoreError};

// ─── State machine ────────────────────────────────────────────────────────────

/// The single in-flight edit, captured when editing begins.
///
/// `original_created` is carried verbatim into any update this intent
/// produces, so editing never rewrites a record's position in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditIntent {
    pub target_id: String,
    pub original_created: DateTime<Utc>,
    pub name: String,
    pub sets: u32,
    pub weight: f64,
}

/// The two states of the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "intent")]
pub enum EditState {
    #[default]
    Idle,
    Editing(EditIntent),
}

impl EditState {
    pub fn is_editing(&self) -> bool {
        matches!(self, EditState::Editing(_))
    }
}

// ─── Inputs & outcomes ────────────────────────────────────────────────────────

/// Raw form strings for a workout submit, unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitFields {
    pub name: String,
    pub sets: String,
    pub weight: String,
}

/// The external collaborator's answer to "really delete this?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// How a delete request ended. `Declined` is a normal abort, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

// ─── Errors ───────────────────────────────────────────────────────────────────

/// A rejected form field. Produced before any store call is made.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field} {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ─── Reconciler ───────────────────────────────────────────────────────────────

/// Owns the edit slot and the store-intent paths for all user actions.
#[derive(Debug)]
pub struct EditReconciler {
    state: EditState,
    /// Field name body-weight values are written under (reads accept the
    /// aliases regardless).
    weight_field: String,
}

impl EditReconciler {
    pub fn new(weight_field: impl Into<String>) -> Self {
        Self {
            state: EditState::Idle,
            weight_field: weight_field.into(),
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    /// Idle → Editing. Beginning a new edit while one is in flight replaces
    /// the previous intent; there is no queue.
    pub fn begin_edit(&mut self, log: WorkoutLog) {
        debug!(id = %log.id, name = %log.name, "edit started");
        self.state = EditState::Editing(EditIntent {
            target_id: log.id,
            original_created: log.created,
            name: log.name,
            sets: log.sets,
            weight: log.weight,
        });
    }

    /// Editing → Idle without touching the store.
    pub fn cancel_edit(&mut self) {
        if self.state.is_editing() {
            debug!("edit canceled");
        }
        self.state = EditState::Idle;
    }

    /// Validate form fields, then create (when Idle) or update (when
    /// Editing) the workout. The Editing → Idle transition happens only
    /// after the store confirms the update; a store failure leaves the
    /// intent in place so the caller can retry or cancel.
    pub async fn submit<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        fields: &SubmitFields,
    ) -> Result<(), EditError> {
        let (name, sets, weight) = validate_submit(fields)?;
        match &self.state {
            EditState::Editing(intent) => {
                let update = workout_fields(&name, sets, weight, intent.original_created);
                store.update(WORKOUTS, &intent.target_id, update).await?;
                info!(id = %intent.target_id, name = %name, "workout updated");
                self.state = EditState::Idle;
            }
            EditState::Idle => {
                let create = workout_fields(&name, sets, weight, Utc::now());
                let id = store.create(WORKOUTS, create).await?;
                info!(id = %id, name = %name, "workout logged");
            }
        }
        Ok(())
    }

    /// Delete a workout, gated on the caller's explicit confirmation. When
    /// the deleted id is the current edit target the edit is cleared too.
    pub async fn delete_log<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        id: &str,
        confirmation: Confirmation,
    ) -> Result<DeleteOutcome, EditError> {
        if confirmation == Confirmation::Declined {
            debug!(id = %id, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }
        store.delete(WORKOUTS, id).await?;
        info!(id = %id, "workout deleted");
        if let EditState::Editing(intent) = &self.state {
            if intent.target_id == id {
                self.state = EditState::Idle;
            }
        }
        Ok(DeleteOutcome::Deleted)
    }

    /// Create an exercise name. Duplicates are tolerated, the mirror
    /// collapses them on display.
    pub async fn add_exercise<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        name: &str,
    ) -> Result<(), EditError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("name", "must not be empty").into());
        }
        let id = store.create(EXERCISES, exercise_fields(name)).await?;
        info!(id = %id, name = %name, "exercise added");
        Ok(())
    }

    /// Record a body-weight measurement with a fresh timestamp.
    pub async fn add_body_weight<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        weight_text: &str,
    ) -> Result<(), EditError> {
        let weight = parse_weight(weight_text)?;
        let fields = body_weight_fields(&self.weight_field, weight, Utc::now());
        let id = store.create(BODYWEIGHTS, fields).await?;
        info!(id = %id, weight, "body weight recorded");
        Ok(())
    }

    /// Delete a body-weight entry, gated on confirmation like workout
    /// deletes.
    pub async fn delete_body_weight<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
        confirmation: Confirmation,
    ) -> Result<DeleteOutcome, EditError> {
        if confirmation == Confirmation::Declined {
            debug!(id = %id, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }
        store.delete(BODYWEIGHTS, id).await?;
        info!(id = %id, "body weight deleted");
        Ok(DeleteOutcome::Deleted)
    }

    /// Reconcile the edit slot against a fresh workouts snapshot. An edit
    /// whose target no longer exists is cleared; it cannot survive a
    /// concurrent delete.
    pub fn reconcile(&mut self, snapshot: &MirrorState) {
        if let EditState::Editing(intent) = &self.state {
            if !snapshot.contains_workout(&intent.target_id) {
                info!(id = %intent.target_id, "edit target gone from snapshot, edit cleared");
                self.state = EditState::Idle;
            }
        }
    }
}

// ─── Validation ───────────────────────────────────────────────────────────────

fn validate_submit(fields: &SubmitFields) -> Result<(String, u32, f64), ValidationError> {
    let name = fields.name.trim();
    if name.is_empty() {
        return Err(ValidationError::new("name", "must not be empty"));
    }
    let sets: u32 = fields
        .sets
        .trim()
        .parse()
        .map_err(|_| ValidationError::new("sets", "must be a whole number"))?;
    if sets == 0 {
        return Err(ValidationError::new("sets", "must be at least 1"));
    }
    let weight = parse_weight(&fields.weight)?;
    Ok((name.to_string(), sets, weight))
}

fn parse_weight(text: &str) -> Result<f64, ValidationError> {
    let weight: f64 = text
        .trim()
        .parse()
        .map_err(|_| ValidationError::new("weight", "must be a number"))?;
    if !weight.is_finite() {
        return Err(ValidationError::new("weight", "must be finite"));
    }
    if weight < 0.0 {
        return Err(ValidationError::new("weight", "must not be negative"));
    }
    Ok(weight)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::{Collection, MirrorState};
    use crate::store::memory::MemoryStore;
    use crate::store::{Notification, SubscribeRequest};
    use chrono::TimeZone;

    fn sample_log(id: &str) -> WorkoutLog {
        WorkoutLog {
            id: id.to_string(),
            name: "Squat".to_string(),
            sets: 5,
            weight: 100.0,
            created: Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap(),
        }
    }

    fn submit_fields(name: &str, sets: &str, weight: &str) -> SubmitFields {
        SubmitFields {
            name: name.to_string(),
            sets: sets.to_string(),
            weight: weight.to_string(),
        }
    }

    async fn workouts_snapshot(store: &MemoryStore) -> Vec<crate::store::Document> {
        let mut sub = store
            .subscribe(SubscribeRequest::new(WORKOUTS))
            .await
            .unwrap();
        sub.next().await.unwrap().unwrap().snapshot
    }

    #[test]
    fn begin_then_cancel_returns_to_idle() {
        let mut reconciler = EditReconciler::new("weight");
        reconciler.begin_edit(sample_log("w1"));
        assert!(reconciler.state().is_editing());
        reconciler.cancel_edit();
        assert_eq!(*reconciler.state(), EditState::Idle);
    }

    #[test]
    fn begin_edit_replaces_a_previous_intent() {
        let mut reconciler = EditReconciler::new("weight");
        reconciler.begin_edit(sample_log("w1"));
        reconciler.begin_edit(sample_log("w2"));
        match reconciler.state() {
            EditState::Editing(intent) => assert_eq!(intent.target_id, "w2"),
            EditState::Idle => panic!("expected editing"),
        }
    }

    #[tokio::test]
    async fn invalid_sets_reports_validation_and_skips_the_store() {
        let store = MemoryStore::new();
        let mut reconciler = EditReconciler::new("weight");
        let err = reconciler
            .submit(&store, &submit_fields("Squat", "0", "100"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EditError::Validation(ValidationError { field: "sets", .. })
        ));
        assert!(workouts_snapshot(&store).await.is_empty());
    }

    #[tokio::test]
    async fn submit_while_idle_creates_a_log() {
        let store = MemoryStore::new();
        let mut reconciler = EditReconciler::new("weight");
        reconciler
            .submit(&store, &submit_fields("Squat", "5", "100"))
            .await
            .unwrap();
        let snapshot = workouts_snapshot(&store).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].str_field("name"), Some("Squat"));
        assert_eq!(*reconciler.state(), EditState::Idle);
    }

    #[tokio::test]
    async fn submit_while_editing_preserves_original_created() {
        let store = MemoryStore::new();
        let created = Utc.with_ymd_and_hms(2026, 7, 1, 8, 0, 0).unwrap();
        let id = store
            .create(WORKOUTS, workout_fields("Squat", 5, 100.0, created))
            .await
            .unwrap();

        let mut reconciler = EditReconciler::new("weight");
        let log = WorkoutLog::from_document(&workouts_snapshot(&store).await[0]).unwrap();
        reconciler.begin_edit(log);
        reconciler
            .submit(&store, &submit_fields("Squat", "3", "120"))
            .await
            .unwrap();

        let snapshot = workouts_snapshot(&store).await;
        let updated = WorkoutLog::from_document(&snapshot[0]).unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.sets, 3);
        assert_eq!(updated.weight, 120.0);
        assert_eq!(updated.created, created);
        assert_eq!(*reconciler.state(), EditState::Idle);
    }

    #[tokio::test]
    async fn store_failure_keeps_the_edit_in_flight() {
        let store = MemoryStore::new();
        let mut reconciler = EditReconciler::new("weight");
        reconciler.begin_edit(sample_log("ghost"));
        let err = reconciler
            .submit(&store, &submit_fields("Squat", "3", "120"))
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::Store(StoreError::NotFound { .. })));
        assert!(reconciler.state().is_editing());
    }

    #[tokio::test]
    async fn declined_delete_makes_no_store_call() {
        let store = MemoryStore::new();
        let id = store
            .create(
                WORKOUTS,
                workout_fields("Squat", 5, 100.0, Utc::now()),
            )
            .await
            .unwrap();

        let mut reconciler = EditReconciler::new("weight");
        let outcome = reconciler
            .delete_log(&store, &id, Confirmation::Declined)
            .await
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert_eq!(workouts_snapshot(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn confirmed_delete_of_edit_target_clears_the_edit() {
        let store = MemoryStore::new();
        let id = store
            .create(
                WORKOUTS,
                workout_fields("Squat", 5, 100.0, Utc::now()),
            )
            .await
            .unwrap();

        let mut reconciler = EditReconciler::new("weight");
        let log = WorkoutLog::from_document(&workouts_snapshot(&store).await[0]).unwrap();
        reconciler.begin_edit(log);
        let outcome = reconciler
            .delete_log(&store, &id, Confirmation::Confirmed)
            .await
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(*reconciler.state(), EditState::Idle);
        assert!(workouts_snapshot(&store).await.is_empty());
    }

    #[test]
    fn reconcile_clears_an_edit_whose_target_vanished() {
        let mut reconciler = EditReconciler::new("weight");
        reconciler.begin_edit(sample_log("w1"));

        let mut state = MirrorState::default();
        state.apply(Collection::Workouts, &Notification { snapshot: vec![] });
        reconciler.reconcile(&state);
        assert_eq!(*reconciler.state(), EditState::Idle);
    }

    #[tokio::test]
    async fn body_weight_input_is_validated() {
        let store = MemoryStore::new();
        let reconciler = EditReconciler::new("weight");
        assert!(reconciler.add_body_weight(&store, "eighty").await.is_err());
        assert!(reconciler.add_body_weight(&store, "-3").await.is_err());
        reconciler.add_body_weight(&store, " 82.4 ").await.unwrap();

        let mut sub = store
            .subscribe(SubscribeRequest::new(BODYWEIGHTS))
            .await
            .unwrap();
        let snapshot = sub.next().await.unwrap().unwrap().snapshot;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].num_field("weight"), Some(82.4));
    }

    #[tokio::test]
    async fn configured_weight_field_is_used_on_write() {
        let store = MemoryStore::new();
        let reconciler = EditReconciler::new("kg");
        reconciler.add_body_weight(&store, "82.4").await.unwrap();

        let mut sub = store
            .subscribe(SubscribeRequest::new(BODYWEIGHTS))
            .await
            .unwrap();
        let snapshot = sub.next().await.unwrap().unwrap().snapshot;
        assert_eq!(snapshot[0].num_field("kg"), Some(82.4));
        assert!(snapshot[0].num_field("weight").is_none());
    }

    #[tokio::test]
    async fn blank_exercise_name_is_rejected() {
        let store = MemoryStore::new();
        let reconciler = EditReconciler::new("weight");
        let err = reconciler.add_exercise(&store, "   ").await.unwrap_err();
        assert!(matches!(err, EditError::Validation(_)));
        reconciler.add_exercise(&store, "Deadlift").await.unwrap();
    }
}
