//! In-process realtime item store.
//!
//! Behaves like the hosted document collection: store-assigned ids,
//! owner-scoped live snapshots, and injectable failures for exercising
//! error paths.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::{ItemStore, StoreError, StoreEvent, Subscription, Unsubscribe};
use crate::media::EncodedImage;
use crate::models::{ItemId, WardrobeItem};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Create,
    Delete,
}

struct Subscriber {
    owner_id: String,
    sender: mpsc::UnboundedSender<StoreEvent>,
}

#[derive(Default)]
struct Inner {
    // Arrival order; snapshots preserve it.
    items: Vec<WardrobeItem>,
    subscribers: HashMap<u64, Subscriber>,
    next_subscriber_id: u64,
    faults: HashMap<StoreOperation, VecDeque<StoreError>>,
    denied_owners: HashSet<String>,
}

impl Inner {
    fn snapshot(&self, owner_id: &str) -> Vec<WardrobeItem> {
        self.items
            .iter()
            .filter(|item| item.owner_id == owner_id)
            .cloned()
            .collect()
    }

    fn notify(&mut self, owner_id: &str) {
        let snapshot = self.snapshot(owner_id);
        self.subscribers.retain(|_, subscriber| {
            if subscriber.owner_id != owner_id {
                return true;
            }
            subscriber
                .sender
                .send(StoreEvent::Snapshot(snapshot.clone()))
                .is_ok()
        });
    }

    fn take_fault(&mut self, operation: StoreOperation) -> Option<StoreError> {
        self.faults.get_mut(&operation)?.pop_front()
    }
}

/// Thread-safe in-memory implementation of [`ItemStore`].
#[derive(Clone)]
pub struct MemoryItemStore {
    inner: Arc<Mutex<Inner>>,
    clock: Clock,
}

impl Default for MemoryItemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Use a custom clock for creation timestamps.
    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock: Arc::new(clock),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call of `operation` with `error`.
    pub fn fail_next(&self, operation: StoreOperation, error: StoreError) {
        self.lock()
            .faults
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Reject every operation scoped to `owner_id` as the access policy would.
    pub fn deny_owner(&self, owner_id: &str) {
        self.lock().denied_owners.insert(owner_id.to_string());
    }

    pub fn allow_owner(&self, owner_id: &str) {
        self.lock().denied_owners.remove(owner_id);
    }

    /// Push an error to every live subscription for `owner_id`.
    pub fn emit_error(&self, owner_id: &str, error: &StoreError) {
        let mut inner = self.lock();
        inner.subscribers.retain(|_, subscriber| {
            subscriber.owner_id != owner_id
                || subscriber
                    .sender
                    .send(StoreEvent::Error(error.clone()))
                    .is_ok()
        });
    }

    /// Number of subscriptions not yet released.
    pub fn active_subscriptions(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// All stored items across owners, in arrival order.
    pub fn items(&self) -> Vec<WardrobeItem> {
        self.lock().items.clone()
    }

    /// Insert a fully formed item as if written by another client.
    pub fn insert(&self, item: WardrobeItem) {
        let mut inner = self.lock();
        let owner_id = item.owner_id.clone();
        inner.items.push(item);
        inner.notify(&owner_id);
    }

    fn create_now(
        &self,
        owner_id: &str,
        label: &str,
        image: &EncodedImage,
    ) -> Result<ItemId, StoreError> {
        let mut inner = self.lock();
        if let Some(error) = inner.take_fault(StoreOperation::Create) {
            return Err(error);
        }
        if inner.denied_owners.contains(owner_id) {
            return Err(StoreError::PermissionDenied);
        }
        let item = WardrobeItem::new(
            ItemId::generate(),
            owner_id,
            label,
            image.clone(),
            (self.clock)(),
        )
        .map_err(|_| StoreError::Unknown("invalid-argument".to_string()))?;
        let id = item.id.clone();
        inner.items.push(item);
        inner.notify(owner_id);
        Ok(id)
    }

    fn delete_now(&self, id: &ItemId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(error) = inner.take_fault(StoreOperation::Delete) {
            return Err(error);
        }
        let index = inner
            .items
            .iter()
            .position(|item| &item.id == id)
            .ok_or(StoreError::NotFound)?;
        if inner.denied_owners.contains(&inner.items[index].owner_id) {
            return Err(StoreError::PermissionDenied);
        }
        let removed = inner.items.remove(index);
        inner.notify(&removed.owner_id);
        Ok(())
    }
}

impl ItemStore for MemoryItemStore {
    async fn create(
        &self,
        owner_id: &str,
        label: &str,
        image: &EncodedImage,
    ) -> Result<ItemId, StoreError> {
        self.create_now(owner_id, label, image)
    }

    async fn delete(&self, id: &ItemId) -> Result<(), StoreError> {
        self.delete_now(id)
    }

    fn subscribe(&self, owner_id: &str) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let subscriber_id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;

        if inner.denied_owners.contains(owner_id) {
            let _ = sender.send(StoreEvent::Error(StoreError::PermissionDenied));
        } else {
            let _ = sender.send(StoreEvent::Snapshot(inner.snapshot(owner_id)));
            inner.subscribers.insert(
                subscriber_id,
                Subscriber {
                    owner_id: owner_id.to_string(),
                    sender,
                },
            );
        }
        drop(inner);

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(
            owner_id,
            receiver,
            Unsubscribe::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .subscribers
                        .remove(&subscriber_id);
                }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn image() -> EncodedImage {
        EncodedImage::encode("image/png", b"png").unwrap()
    }

    fn snapshot_labels(event: Option<StoreEvent>) -> Vec<String> {
        match event {
            Some(StoreEvent::Snapshot(items)) => items.into_iter().map(|item| item.label).collect(),
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn subscribe_delivers_initial_snapshot_then_changes() {
        let store = MemoryItemStore::new();
        store.create("alice", "Scarf", &image()).await.unwrap();

        let mut subscription = store.subscribe("alice");
        assert_eq!(snapshot_labels(subscription.try_next()), vec!["Scarf"]);
        assert!(subscription.try_next().is_none());

        let id = store.create("alice", "Hat", &image()).await.unwrap();
        assert_eq!(snapshot_labels(subscription.try_next()), vec!["Scarf", "Hat"]);

        store.delete(&id).await.unwrap();
        assert_eq!(snapshot_labels(subscription.try_next()), vec!["Scarf"]);
    }

    #[tokio::test]
    async fn snapshots_are_scoped_to_owner() {
        let store = MemoryItemStore::new();
        let mut alice = store.subscribe("alice");
        let mut bob = store.subscribe("bob");
        alice.try_next();
        bob.try_next();

        store.create("bob", "Boots", &image()).await.unwrap();
        assert!(alice.try_next().is_none());
        assert_eq!(snapshot_labels(bob.try_next()), vec!["Boots"]);
    }

    #[tokio::test]
    async fn delete_missing_item_is_not_found() {
        let store = MemoryItemStore::new();
        let missing: ItemId = "missing".parse().unwrap();
        assert_eq!(store.delete(&missing).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn injected_faults_apply_once() {
        let store = MemoryItemStore::new();
        store.fail_next(StoreOperation::Create, StoreError::Unavailable);
        assert_eq!(
            store.create("alice", "Hat", &image()).await,
            Err(StoreError::Unavailable)
        );
        assert!(store.create("alice", "Hat", &image()).await.is_ok());
    }

    #[tokio::test]
    async fn denied_owner_cannot_create_or_subscribe() {
        let store = MemoryItemStore::new();
        store.deny_owner("mallory");
        assert_eq!(
            store.create("mallory", "Hat", &image()).await,
            Err(StoreError::PermissionDenied)
        );
        let mut subscription = store.subscribe("mallory");
        assert_eq!(
            subscription.try_next(),
            Some(StoreEvent::Error(StoreError::PermissionDenied))
        );
        assert_eq!(store.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn cancelled_subscription_is_released() {
        let store = MemoryItemStore::new();
        let subscription = store.subscribe("alice");
        assert_eq!(store.active_subscriptions(), 1);
        subscription.cancel();
        assert_eq!(store.active_subscriptions(), 0);

        store.create("alice", "Hat", &image()).await.unwrap();
        assert_eq!(store.items().len(), 1);
    }

    #[tokio::test]
    async fn create_uses_store_clock_and_rejects_blank_label() {
        let fixed = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let store = MemoryItemStore::with_clock(move || fixed);
        store.create("alice", " Hat ", &image()).await.unwrap();
        let items = store.items();
        assert_eq!(items[0].created_at, fixed);
        assert_eq!(items[0].label, "Hat");

        assert_eq!(
            store.create("alice", "  ", &image()).await,
            Err(StoreError::Unknown("invalid-argument".to_string()))
        );
    }
}
