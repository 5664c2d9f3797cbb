//! The tracker client — one spawned task that owns the mirror, the edit
//! slot, and the analytics parameters.
//!
//! Mirror notifications, command handling, and analytics recomputation all
//! run on this single task, one unit of work at a time, so no two
//! recomputations ever overlap and the edit slot has exactly one writer.
//! Callers hold a cloneable [`TrackerHandle`] and observe state through a
//! `tokio::sync::watch` channel carrying the latest [`TrackerView`].

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::analytics::{self, AnalyticsParams, AnalyticsView, TimeRange};
use crate::config::TrackerConfig;
use crate::edit::{
    Confirmation, DeleteOutcome, EditError, EditReconciler, EditState, SubmitFields,
};
use crate::mirror::{Collection, MirrorState, MirrorSubscriptions};
use crate::model::WorkoutLog;
use crate::store::{Notification, RecordStore, StoreError};

const COMMAND_BUFFER: usize = 32;

// ─── Published view ───────────────────────────────────────────────────────────

/// Where the mirror stands relative to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Initial snapshots have not all arrived yet.
    Syncing,
    /// All collections delivered their initial snapshot and are streaming.
    Live,
    /// A subscription failed or ended; the mirror may be stale. No automatic
    /// retry.
    Failed(String),
}

/// The composite state published after every change.
#[derive(Debug, Clone)]
pub struct TrackerView {
    /// The typed mirror snapshot the analytics were computed from.
    pub snapshot: Arc<MirrorState>,
    pub analytics: AnalyticsView,
    pub edit: EditState,
    pub sync: SyncStatus,
}

impl Default for TrackerView {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(MirrorState::default()),
            analytics: AnalyticsView::default(),
            edit: EditState::Idle,
            sync: SyncStatus::Syncing,
        }
    }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

enum Command {
    BeginEdit {
        log: WorkoutLog,
        reply: oneshot::Sender<()>,
    },
    CancelEdit {
        reply: oneshot::Sender<()>,
    },
    Submit {
        fields: SubmitFields,
        reply: oneshot::Sender<Result<(), EditError>>,
    },
    DeleteLog {
        id: String,
        confirmation: Confirmation,
        reply: oneshot::Sender<Result<DeleteOutcome, EditError>>,
    },
    AddExercise {
        name: String,
        reply: oneshot::Sender<Result<(), EditError>>,
    },
    AddBodyWeight {
        weight: String,
        reply: oneshot::Sender<Result<(), EditError>>,
    },
    DeleteBodyWeight {
        id: String,
        confirmation: Confirmation,
        reply: oneshot::Sender<Result<DeleteOutcome, EditError>>,
    },
    SetParams {
        selected: Option<String>,
        range: TimeRange,
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

// ─── Handle ───────────────────────────────────────────────────────────────────

/// Cloneable front door to the client task. All operations reply through a
/// oneshot; a closed client reports [`StoreError::Closed`].
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<Command>,
    view: watch::Receiver<TrackerView>,
}

impl TrackerHandle {
    /// Fresh receiver for the published view. `borrow()` always holds the
    /// latest value.
    pub fn view(&self) -> watch::Receiver<TrackerView> {
        self.view.clone()
    }

    pub async fn begin_edit(&self, log: WorkoutLog) -> Result<(), EditError> {
        self.request(|reply| Command::BeginEdit { log, reply }).await
    }

    pub async fn cancel_edit(&self) -> Result<(), EditError> {
        self.request(|reply| Command::CancelEdit { reply }).await
    }

    pub async fn submit(&self, fields: SubmitFields) -> Result<(), EditError> {
        self.request(|reply| Command::Submit { fields, reply })
            .await?
    }

    pub async fn delete_log(
        &self,
        id: impl Into<String>,
        confirmation: Confirmation,
    ) -> Result<DeleteOutcome, EditError> {
        let id = id.into();
        self.request(|reply| Command::DeleteLog {
            id,
            confirmation,
            reply,
        })
        .await?
    }

    pub async fn add_exercise(&self, name: impl Into<String>) -> Result<(), EditError> {
        let name = name.into();
        self.request(|reply| Command::AddExercise { name, reply })
            .await?
    }

    pub async fn add_body_weight(&self, weight: impl Into<String>) -> Result<(), EditError> {
        let weight = weight.into();
        self.request(|reply| Command::AddBodyWeight { weight, reply })
            .await?
    }

    pub async fn delete_body_weight(
        &self,
        id: impl Into<String>,
        confirmation: Confirmation,
    ) -> Result<DeleteOutcome, EditError> {
        let id = id.into();
        self.request(|reply| Command::DeleteBodyWeight {
            id,
            confirmation,
            reply,
        })
        .await?
    }

    /// Change the focused exercise and window for subsequent recomputations.
    pub async fn set_params(
        &self,
        selected: Option<String>,
        range: TimeRange,
    ) -> Result<(), EditError> {
        self.request(|reply| Command::SetParams {
            selected,
            range,
            reply,
        })
        .await
    }

    /// Stop the client task and release every subscription. Idempotent;
    /// calling it on an already-stopped client returns immediately.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Command::Shutdown { reply }).await.is_ok() {
            let _ = done.await;
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, EditError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| EditError::Store(StoreError::Closed))?;
        response
            .await
            .map_err(|_| EditError::Store(StoreError::Closed))
    }
}

// ─── Client task ──────────────────────────────────────────────────────────────

/// The event-loop actor behind a [`TrackerHandle`].
pub struct TrackerClient {
    store: Arc<dyn RecordStore>,
    mirror: MirrorState,
    params: AnalyticsParams,
    reconciler: EditReconciler,
    sync: SyncStatus,
    synced: [bool; 3],
    view_tx: watch::Sender<TrackerView>,
}

impl TrackerClient {
    /// Subscribe to all collections and start the client task.
    ///
    /// A subscription that cannot be opened fails the spawn outright; once
    /// this returns `Ok` the task is running and the handle is live.
    pub async fn spawn(
        store: Arc<dyn RecordStore>,
        config: &TrackerConfig,
    ) -> Result<TrackerHandle, StoreError> {
        let subs = MirrorSubscriptions::open(store.as_ref(), config.log_order).await?;
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (view_tx, view) = watch::channel(TrackerView::default());

        let client = TrackerClient {
            store,
            mirror: MirrorState::default(),
            params: AnalyticsParams {
                selected: None,
                range: TimeRange::default(),
                metric: config.metric,
                sort_days: config.sort_days,
            },
            reconciler: EditReconciler::new(&config.weight_field),
            sync: SyncStatus::Syncing,
            synced: [false; 3],
            view_tx,
        };
        tokio::spawn(client.run(subs, rx));
        info!("tracker client started");
        Ok(TrackerHandle { tx, view })
    }

    async fn run(
        mut self,
        mut subs: MirrorSubscriptions,
        mut commands: mpsc::Receiver<Command>,
    ) {
        let mut exercises_done = false;
        let mut workouts_done = false;
        let mut body_weights_done = false;

        loop {
            tokio::select! {
                note = subs.exercises.next(), if !exercises_done => {
                    exercises_done = self.apply_note(Collection::Exercises, note);
                }
                note = subs.workouts.next(), if !workouts_done => {
                    workouts_done = self.apply_note(Collection::Workouts, note);
                }
                note = subs.body_weights.next(), if !body_weights_done => {
                    body_weights_done = self.apply_note(Collection::BodyWeights, note);
                }
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        subs.unsubscribe_all();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    // every handle dropped: nobody left to observe
                    None => break,
                },
            }
        }

        subs.unsubscribe_all();
        info!("tracker client stopped");
    }

    /// Fold one notification into the mirror. Returns `true` when the feed
    /// is finished and must not be polled again.
    fn apply_note(
        &mut self,
        collection: Collection,
        note: Option<Result<Notification, StoreError>>,
    ) -> bool {
        match note {
            Some(Ok(notification)) => {
                self.mirror.apply(collection, &notification);
                if collection == Collection::Workouts {
                    self.reconciler.reconcile(&self.mirror);
                }
                self.mark_synced(collection);
                self.publish();
                false
            }
            Some(Err(err)) => {
                warn!(collection = collection.name(), err = %err, "subscription failed");
                self.sync = SyncStatus::Failed(err.to_string());
                self.publish();
                true
            }
            None => {
                warn!(collection = collection.name(), "subscription ended unexpectedly");
                self.sync =
                    SyncStatus::Failed(format!("{} subscription ended", collection.name()));
                self.publish();
                true
            }
        }
    }

    fn mark_synced(&mut self, collection: Collection) {
        let slot = match collection {
            Collection::Exercises => 0,
            Collection::Workouts => 1,
            Collection::BodyWeights => 2,
        };
        self.synced[slot] = true;
        if self.sync == SyncStatus::Syncing && self.synced.iter().all(|seen| *seen) {
            self.sync = SyncStatus::Live;
            info!("mirror live");
        }
    }

    async fn handle_command(&mut self, command: Command) {
        let store = Arc::clone(&self.store);
        match command {
            Command::BeginEdit { log, reply } => {
                self.reconciler.begin_edit(log);
                self.publish();
                let _ = reply.send(());
            }
            Command::CancelEdit { reply } => {
                self.reconciler.cancel_edit();
                self.publish();
                let _ = reply.send(());
            }
            Command::Submit { fields, reply } => {
                let result = self.reconciler.submit(store.as_ref(), &fields).await;
                if result.is_ok() {
                    self.publish();
                }
                let _ = reply.send(result);
            }
            Command::DeleteLog {
                id,
                confirmation,
                reply,
            } => {
                let result = self
                    .reconciler
                    .delete_log(store.as_ref(), &id, confirmation)
                    .await;
                if matches!(result, Ok(DeleteOutcome::Deleted)) {
                    self.publish();
                }
                let _ = reply.send(result);
            }
            Command::AddExercise { name, reply } => {
                let _ = reply.send(self.reconciler.add_exercise(store.as_ref(), &name).await);
            }
            Command::AddBodyWeight { weight, reply } => {
                let _ = reply.send(
                    self.reconciler
                        .add_body_weight(store.as_ref(), &weight)
                        .await,
                );
            }
            Command::DeleteBodyWeight {
                id,
                confirmation,
                reply,
            } => {
                let _ = reply.send(
                    self.reconciler
                        .delete_body_weight(store.as_ref(), &id, confirmation)
                        .await,
                );
            }
            Command::SetParams {
                selected,
                range,
                reply,
            } => {
                debug!(selected = ?selected, range = ?range, "analytics params changed");
                self.params.selected = selected;
                self.params.range = range;
                self.publish();
                let _ = reply.send(());
            }
            // intercepted by the run loop; answered here only for exhaustiveness
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn publish(&mut self) {
        let analytics = analytics::compute(&self.mirror, &self.params, Utc::now());
        self.view_tx.send_replace(TrackerView {
            snapshot: Arc::new(self.mirror.clone()),
            analytics,
            edit: self.reconciler.state().clone(),
            sync: self.sync.clone(),
        });
    }
}
