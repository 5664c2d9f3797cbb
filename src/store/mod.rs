//! The record-store seam.
//!
//! Everything the client knows about the remote store is expressed here:
//! an async [`RecordStore`] trait over document collections, a notification
//! [`Subscription`] that delivers full snapshots, and the [`StoreError`]
//! taxonomy. Hosting, persistence, and transport are the store's concern;
//! the crate ships [`memory::MemoryStore`] as the reference implementation
//! for tests and the demo binary.

pub mod memory;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw field map of one record, as the store sees it.
pub type Fields = serde_json::Map<String, Value>;

/// One record in a collection: a store-assigned id plus its raw fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// String field accessor; `None` when absent or not a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Finite-number field accessor; `None` when absent, non-numeric, or
    /// non-finite (NaN/infinity never leak into aggregation).
    pub fn num_field(&self, name: &str) -> Option<f64> {
        self.fields
            .get(name)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    }
}

// ─── Subscriptions ────────────────────────────────────────────────────────────

/// Sort direction for an ordered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// Parameters of one collection subscription.
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    pub collection: String,
    /// Field to order the snapshot by; `None` keeps store insertion order.
    pub order_by: Option<String>,
    pub direction: Direction,
}

impl SubscribeRequest {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            order_by: None,
            direction: Direction::Ascending,
        }
    }

    pub fn ordered_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(field.into());
        self.direction = direction;
        self
    }
}

/// One change notification: the full, ordered contents of the collection.
/// Never a diff — each notification replaces everything delivered before it.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub snapshot: Vec<Document>,
}

/// Boxed stream of notifications, `Err` terminating the feed.
pub type NotificationStream =
    Pin<Box<dyn Stream<Item = Result<Notification, StoreError>> + Send>>;

/// Live handle to one collection subscription.
///
/// The store-side resource is released exactly once: either by an explicit
/// [`unsubscribe`](Subscription::unsubscribe) or implicitly on drop. After
/// release, [`next`](Subscription::next) yields `None`; a torn-down
/// subscription never produces another notification.
pub struct Subscription {
    feed: NotificationStream,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Assemble a subscription from a notification feed and a release action.
    /// Store implementations call this; consumers only poll it.
    pub fn new(
        feed: impl Stream<Item = Result<Notification, StoreError>> + Send + 'static,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            feed: Box::pin(feed),
            release: Some(Box::new(release)),
        }
    }

    /// Await the next notification. `None` means the feed has ended — either
    /// the subscription was torn down or the store closed it.
    pub async fn next(&mut self) -> Option<Result<Notification, StoreError>> {
        self.feed.next().await
    }

    /// Tear the subscription down and release the store-side resource.
    /// Idempotent; a second call (or the implicit drop) does nothing.
    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            self.feed = Box::pin(futures_util::stream::empty());
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.release.is_none())
            .finish()
    }
}

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Errors surfaced by store operations and subscription feeds.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("store connection closed")]
    Closed,
    #[error("subscription lagged behind by {0} notifications")]
    Lagged(u64),
    #[error("store rejected the operation: {0}")]
    Rejected(String),
}

// ─── RecordStore ──────────────────────────────────────────────────────────────

/// Common interface to the remote document store.
///
/// Mutations resolve when the store has accepted them; their effect becomes
/// visible to consumers only through a later subscription notification, never
/// through the return value.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Open a notification stream over one collection. Every notification
    /// carries the full snapshot, ordered per the request.
    async fn subscribe(&self, request: SubscribeRequest) -> Result<Subscription, StoreError>;

    /// Create a record; returns the store-assigned id.
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Partially update a record. Fields absent from `fields` keep their
    /// stored value. Fails with [`StoreError::NotFound`] for an unknown id.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Delete a record. Deleting an id that is already gone is a no-op,
    /// matching remote-store semantics for concurrent deletes.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
