// SPDX-License-Identifier: MIT
//! In-memory [`RecordStore`] — the reference collaborator used by tests and
//! the demo binary.
//!
//! Collections are plain ordered vectors behind one `RwLock`. Every mutation
//! fans the full, insertion-ordered snapshot out to all subscribers of that
//! collection over a tokio broadcast channel; each subscription applies its
//! own ordering request on the way out. A subscriber that falls behind the
//! broadcast buffer receives [`StoreError::Lagged`] and its feed ends; it is
//! never silently skipped ahead.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{future, stream, StreamExt};
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::debug;
use uuid::Uuid;

use super::{
    Direction, Document, Fields, Notification, RecordStore, StoreError, SubscribeRequest,
    Subscription,
};

/// Broadcast buffer per collection. Slow consumers beyond this depth lag out.
const NOTIFY_BUFFER: usize = 64;

struct CollectionEntry {
    docs: Vec<Document>,
    tx: broadcast::Sender<Notification>,
    subscribers: Arc<AtomicUsize>,
}

impl CollectionEntry {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFY_BUFFER);
        Self {
            docs: Vec::new(),
            tx,
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn notify(&self) {
        // Ignore errors, no subscribers is fine
        let _ = self.tx.send(Notification {
            snapshot: self.docs.clone(),
        });
    }
}

/// In-memory document store with full-snapshot change notifications.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, CollectionEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on a collection (0 for unknown names).
    /// Exposed so tests can assert the release discipline.
    pub async fn subscriber_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|entry| entry.subscribers.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn subscribe(&self, request: SubscribeRequest) -> Result<Subscription, StoreError> {
        if request.collection.is_empty() {
            return Err(StoreError::Rejected("empty collection name".into()));
        }

        // Register the receiver and read the current contents under one write
        // lock so no concurrent mutation can slip between the two.
        let mut collections = self.collections.write().await;
        let entry = collections
            .entry(request.collection.clone())
            .or_insert_with(CollectionEntry::new);
        let rx = entry.tx.subscribe();
        let initial = Notification {
            snapshot: order_snapshot(entry.docs.clone(), &request),
        };
        let subscribers = Arc::clone(&entry.subscribers);
        subscribers.fetch_add(1, Ordering::SeqCst);
        drop(collections);

        debug!(collection = %request.collection, "subscription opened");

        let live_request = request.clone();
        let live = BroadcastStream::new(rx)
            .map(move |received| match received {
                Ok(note) => Ok(Notification {
                    snapshot: order_snapshot(note.snapshot, &live_request),
                }),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => Err(StoreError::Lagged(skipped)),
            })
            // A lagged subscriber has lost the ordering guarantee: surface the
            // error once, then end the feed.
            .scan(false, |failed, item| {
                if *failed {
                    return future::ready(None);
                }
                *failed = item.is_err();
                future::ready(Some(item))
            });

        let feed = stream::once(future::ready(Ok(initial))).chain(live);
        let collection = request.collection;
        Ok(Subscription::new(feed, move || {
            subscribers.fetch_sub(1, Ordering::SeqCst);
            debug!(collection = %collection, "subscription released");
        }))
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        if collection.is_empty() {
            return Err(StoreError::Rejected("empty collection name".into()));
        }
        let id = Uuid::new_v4().to_string();
        let mut collections = self.collections.write().await;
        let entry = collections
            .entry(collection.to_string())
            .or_insert_with(CollectionEntry::new);
        entry.docs.push(Document::new(id.clone(), fields));
        entry.notify();
        debug!(collection = %collection, id = %id, "record created");
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection, id))?;
        let doc = entry
            .docs
            .iter_mut()
            .find(|doc| doc.id == id)
            .ok_or_else(|| not_found(collection, id))?;
        for (key, value) in fields {
            doc.fields.insert(key, value);
        }
        entry.notify();
        debug!(collection = %collection, id = %id, "record updated");
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let Some(entry) = collections.get_mut(collection) else {
            return Ok(());
        };
        let before = entry.docs.len();
        entry.docs.retain(|doc| doc.id != id);
        if entry.docs.len() != before {
            entry.notify();
            debug!(collection = %collection, id = %id, "record deleted");
        }
        Ok(())
    }
}

fn not_found(collection: &str, id: &str) -> StoreError {
    StoreError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

/// Apply a subscription's ordering request to a raw snapshot.
///
/// Records missing the order field sort last regardless of direction, so
/// malformed records never scramble the well-formed ones; equal and
/// non-comparable values keep their relative order (stable sort).
fn order_snapshot(mut docs: Vec<Document>, request: &SubscribeRequest) -> Vec<Document> {
    let Some(field) = &request.order_by else {
        return docs;
    };
    docs.sort_by(|a, b| match (a.fields.get(field), b.fields.get(field)) {
        (None, None) => CmpOrdering::Equal,
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (Some(x), Some(y)) => {
            let ordering = compare_values(x, y);
            match request.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        }
    });
    docs
}

fn compare_values(a: &Value, b: &Value) -> CmpOrdering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        // RFC 3339 UTC timestamps compare correctly as strings
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => CmpOrdering::Equal,
    }
}
