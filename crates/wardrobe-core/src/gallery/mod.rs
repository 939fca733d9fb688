//! Live gallery: owns the single active subscription and the rendered view.

mod bindings;

use std::sync::Arc;

pub use bindings::{BindingChanges, DeleteBindings, HandlerId};

use crate::models::{ItemId, Session, WardrobeItem};
use crate::status::{RetryAction, StatusReporter};
use crate::store::{ItemStore, StoreEvent, Subscription};

/// One rendered gallery entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryRow {
    pub id: ItemId,
    pub label: String,
    pub image_src: String,
}

/// Declarative gallery contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryView {
    pub rows: Vec<GalleryRow>,
    pub empty_state_visible: bool,
}

impl Default for GalleryView {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            empty_state_visible: true,
        }
    }
}

impl GalleryView {
    /// Rows for a snapshot, newest first.
    ///
    /// Items with equal timestamps keep their snapshot order.
    pub fn from_snapshot(mut items: Vec<WardrobeItem>) -> Self {
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let rows: Vec<GalleryRow> = items
            .into_iter()
            .map(|item| GalleryRow {
                id: item.id,
                label: item.label,
                image_src: item.image_data.into(),
            })
            .collect();
        Self {
            empty_state_visible: rows.is_empty(),
            rows,
        }
    }
}

/// Subscription lifecycle as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryState {
    Unsubscribed,
    Subscribed(String),
}

/// Keeps the rendered list in step with the owner's remote collection.
pub struct GallerySync<S> {
    store: Arc<S>,
    subscription: Option<Subscription>,
    view: GalleryView,
    bindings: DeleteBindings,
}

impl<S: ItemStore> GallerySync<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            subscription: None,
            view: GalleryView::default(),
            bindings: DeleteBindings::default(),
        }
    }

    pub fn state(&self) -> GalleryState {
        self.subscription
            .as_ref()
            .map_or(GalleryState::Unsubscribed, |subscription| {
                GalleryState::Subscribed(subscription.owner_id().to_string())
            })
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.subscription.as_ref().map(Subscription::owner_id)
    }

    pub const fn view(&self) -> &GalleryView {
        &self.view
    }

    pub const fn bindings(&self) -> &DeleteBindings {
        &self.bindings
    }

    /// Item targeted by a row's delete handler.
    pub fn resolve_delete(&self, handler: HandlerId) -> Option<ItemId> {
        self.bindings.resolve(handler).cloned()
    }

    /// Follow a session transition.
    ///
    /// Signing in subscribes, signing out unsubscribes, and an owner change
    /// swaps subscriptions without rendering anything from the old owner.
    pub fn apply_session(&mut self, session: &Session) {
        let current = self.owner_id().map(ToString::to_string);
        match (current.as_deref(), session.uid()) {
            (Some(current), Some(next)) if current == next => {}
            (_, Some(next)) => self.subscribe(next),
            (Some(_), None) => self.unsubscribe(),
            (None, None) => {}
        }
    }

    /// Subscribe to `owner_id`, releasing any existing subscription first.
    pub fn subscribe(&mut self, owner_id: &str) {
        if self.subscription.is_some() {
            self.unsubscribe();
        }
        tracing::info!("Subscribing to gallery updates");
        self.subscription = Some(self.store.subscribe(owner_id));
    }

    /// Stop deliveries and clear the rendered view.
    pub fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            tracing::info!("Unsubscribing from gallery updates");
            subscription.cancel();
        }
        self.view = GalleryView::default();
        self.bindings.clear();
    }

    /// Process every delivery queued so far. Returns how many were handled.
    pub fn pump(&mut self, status: &mut StatusReporter) -> usize {
        let mut handled = 0;
        while let Some(event) = self
            .subscription
            .as_mut()
            .and_then(Subscription::try_next)
        {
            self.handle(event, status);
            handled += 1;
        }
        handled
    }

    /// Wait for the next delivery and process it.
    ///
    /// Returns `false` when there is no live subscription to wait on.
    pub async fn next(&mut self, status: &mut StatusReporter) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.next().await {
            Some(event) => {
                self.handle(event, status);
                true
            }
            None => false,
        }
    }

    fn handle(&mut self, event: StoreEvent, status: &mut StatusReporter) {
        match event {
            StoreEvent::Snapshot(items) => self.render(items),
            StoreEvent::Error(error) => {
                let Some(owner_id) = self.owner_id().map(ToString::to_string) else {
                    return;
                };
                tracing::warn!("Gallery subscription failed: {}", error);
                status.report_store_error(
                    "Failed to load items",
                    &error,
                    Some(RetryAction::Resubscribe { owner_id }),
                );
            }
        }
    }

    fn render(&mut self, items: Vec<WardrobeItem>) {
        // Deliveries only arrive through a live subscription, so a torn-down
        // view is never rendered into.
        if self.subscription.is_none() {
            return;
        }
        tracing::debug!("Rendering gallery snapshot with {} items", items.len());
        self.view = GalleryView::from_snapshot(items);
        let changes = self
            .bindings
            .reconcile(self.view.rows.iter().map(|row| &row.id));
        if !changes.is_empty() {
            tracing::debug!(
                "Gallery bindings: {} bound, {} detached",
                changes.bound.len(),
                changes.detached.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::media::EncodedImage;
    use crate::store::{MemoryItemStore, StoreError};

    fn image() -> EncodedImage {
        EncodedImage::encode("image/jpeg", b"jpeg").unwrap()
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn item(id: &str, owner: &str, label: &str, created_at: DateTime<Utc>) -> WardrobeItem {
        WardrobeItem::new(id.parse().unwrap(), owner, label, image(), created_at).unwrap()
    }

    fn labels(gallery: &GallerySync<MemoryItemStore>) -> Vec<String> {
        gallery
            .view()
            .rows
            .iter()
            .map(|row| row.label.clone())
            .collect()
    }

    fn signed_in(uid: &str) -> Session {
        Session::Anonymous {
            uid: uid.to_string(),
        }
    }

    #[test]
    fn view_sorts_newest_first_and_keeps_ties_stable() {
        let t = base_time();
        let view = GalleryView::from_snapshot(vec![
            item("a", "u", "Old", t),
            item("b", "u", "Tie 1", t + Duration::seconds(5)),
            item("c", "u", "Tie 2", t + Duration::seconds(5)),
            item("d", "u", "New", t + Duration::seconds(9)),
        ]);
        let labels: Vec<&str> = view.rows.iter().map(|row| row.label.as_str()).collect();
        assert_eq!(labels, vec!["New", "Tie 1", "Tie 2", "Old"]);
        assert!(!view.empty_state_visible);
    }

    #[test]
    fn empty_snapshot_shows_empty_state() {
        assert!(GalleryView::from_snapshot(Vec::new()).empty_state_visible);
    }

    #[test]
    fn session_transitions_drive_subscription() {
        let store = Arc::new(MemoryItemStore::new());
        let mut gallery = GallerySync::new(store.clone());
        assert_eq!(gallery.state(), GalleryState::Unsubscribed);

        gallery.apply_session(&signed_in("alice"));
        assert_eq!(gallery.state(), GalleryState::Subscribed("alice".to_string()));
        assert_eq!(store.active_subscriptions(), 1);

        gallery.apply_session(&signed_in("alice"));
        assert_eq!(store.active_subscriptions(), 1);

        gallery.apply_session(&Session::LoggedOut);
        assert_eq!(gallery.state(), GalleryState::Unsubscribed);
        assert_eq!(store.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn renders_latest_snapshot() {
        let store = Arc::new(MemoryItemStore::new());
        let mut status = StatusReporter::default();
        let mut gallery = GallerySync::new(store.clone());
        gallery.apply_session(&signed_in("alice"));

        gallery.pump(&mut status);
        assert!(gallery.view().empty_state_visible);

        let id = store.create("alice", "Blue Shirt", &image()).await.unwrap();
        gallery.pump(&mut status);
        assert_eq!(labels(&gallery), vec!["Blue Shirt"]);
        assert!(gallery.bindings().handler_for(&id).is_some());

        store.delete(&id).await.unwrap();
        gallery.pump(&mut status);
        assert!(labels(&gallery).is_empty());
        assert!(gallery.view().empty_state_visible);
        assert!(gallery.bindings().is_empty());
    }

    #[tokio::test]
    async fn rerendering_same_snapshot_keeps_bindings() {
        let store = Arc::new(MemoryItemStore::new());
        let mut status = StatusReporter::default();
        let mut gallery = GallerySync::new(store.clone());
        let id = store.create("alice", "Hat", &image()).await.unwrap();
        gallery.apply_session(&signed_in("alice"));
        gallery.pump(&mut status);
        let view = gallery.view().clone();
        let handler = gallery.bindings().handler_for(&id);

        gallery.render(store.items());
        assert_eq!(gallery.view(), &view);
        assert_eq!(gallery.bindings().handler_for(&id), handler);
        assert_eq!(gallery.bindings().len(), 1);
    }

    #[tokio::test]
    async fn owner_change_never_renders_previous_owner_items() {
        let store = Arc::new(MemoryItemStore::new());
        let mut status = StatusReporter::default();
        store.insert(item("a1", "alice", "Alice Coat", base_time()));
        store.insert(item("b1", "bob", "Bob Boots", base_time()));

        let mut gallery = GallerySync::new(store.clone());
        gallery.apply_session(&signed_in("alice"));
        gallery.pump(&mut status);
        assert_eq!(labels(&gallery), vec!["Alice Coat"]);

        // Queue a delivery on alice's subscription that is never consumed.
        store.insert(item("a2", "alice", "Alice Hat", base_time()));

        gallery.apply_session(&signed_in("bob"));
        assert!(labels(&gallery).is_empty());
        gallery.pump(&mut status);
        assert_eq!(labels(&gallery), vec!["Bob Boots"]);
        assert_eq!(store.active_subscriptions(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_discards_in_flight_delivery() {
        let store = Arc::new(MemoryItemStore::new());
        let mut status = StatusReporter::default();
        let mut gallery = GallerySync::new(store.clone());
        gallery.apply_session(&signed_in("alice"));
        store.create("alice", "Hat", &image()).await.unwrap();

        gallery.apply_session(&Session::LoggedOut);
        assert_eq!(gallery.pump(&mut status), 0);
        assert!(gallery.view().rows.is_empty());
    }

    #[tokio::test]
    async fn subscription_error_offers_resubscribe() {
        let store = Arc::new(MemoryItemStore::new());
        let mut status = StatusReporter::default();
        let mut gallery = GallerySync::new(store.clone());
        gallery.apply_session(&signed_in("alice"));
        gallery.pump(&mut status);

        store.emit_error("alice", &StoreError::Unavailable);
        gallery.pump(&mut status);
        assert_eq!(
            status.retry_action(),
            Some(&RetryAction::Resubscribe {
                owner_id: "alice".to_string()
            })
        );
    }

    #[tokio::test]
    async fn next_waits_for_delivery() {
        let store = Arc::new(MemoryItemStore::new());
        let mut status = StatusReporter::default();
        let mut gallery = GallerySync::new(store.clone());
        assert!(!gallery.next(&mut status).await);

        gallery.apply_session(&signed_in("alice"));
        assert!(gallery.next(&mut status).await);
        assert!(gallery.view().empty_state_visible);
    }
}
