//! Upload form: pending image, label and the submit action.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::ingest::{ImageIngest, PendingImage, SelectedFile, ValidationError};
use crate::media::EncodedImage;
use crate::models::{ItemId, Session};
use crate::status::{RetryAction, StatusReporter};
use crate::store::ItemStore;

/// Submit preconditions, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("You are offline. Reconnect to save items.")]
    Offline,
    #[error("You must be logged in to save items.")]
    NotAuthenticated,
    #[error("Choose an image first.")]
    MissingImage,
    #[error("Enter a label for the item.")]
    EmptyLabel,
    #[error("A save is already in progress.")]
    Busy,
}

/// Exact label and image handed to the store for one create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub label: String,
    pub image: EncodedImage,
}

/// Shared in-progress marker for the submit control.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark busy until the returned guard is dropped. `None` if already busy.
    pub fn acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(self.0.clone()))
    }
}

/// Clears the busy marker when dropped, on every exit path.
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State of one signed-in form session.
#[derive(Debug, Clone)]
pub struct FormSession {
    ingest: ImageIngest,
    label: String,
}

impl FormSession {
    pub const fn new(max_image_bytes: u64) -> Self {
        Self {
            ingest: ImageIngest::new(max_image_bytes),
            label: String::new(),
        }
    }

    pub const fn pending_image(&self) -> Option<&PendingImage> {
        self.ingest.pending()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Image and trimmed label, if both are present.
    pub fn snapshot(&self) -> Result<PendingSubmission, FormError> {
        let image = self.ingest.pending().ok_or(FormError::MissingImage)?;
        let label = self.label.trim();
        if label.is_empty() {
            return Err(FormError::EmptyLabel);
        }
        Ok(PendingSubmission {
            label: label.to_string(),
            image: image.image.clone(),
        })
    }

    pub fn is_complete(&self) -> bool {
        self.snapshot().is_ok()
    }

    fn holds(&self, submission: &PendingSubmission) -> bool {
        self.snapshot().is_ok_and(|current| current == *submission)
    }

    fn clear(&mut self) {
        self.ingest.clear();
        self.label.clear();
    }
}

/// Orchestrates image ingest and label input into a store `create`.
pub struct FormController<S> {
    store: Arc<S>,
    max_image_bytes: u64,
    form: FormSession,
    busy: BusyFlag,
}

impl<S: ItemStore> FormController<S> {
    pub fn new(store: Arc<S>, max_image_bytes: u64) -> Self {
        Self {
            store,
            max_image_bytes,
            form: FormSession::new(max_image_bytes),
            busy: BusyFlag::default(),
        }
    }

    pub const fn form(&self) -> &FormSession {
        &self.form
    }

    /// Handle for observing the in-progress marker.
    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    /// Tear down the current form session and start an empty one.
    pub fn reset_session(&mut self) {
        self.form = FormSession::new(self.max_image_bytes);
    }

    /// Validate and hold `file` as the pending image.
    ///
    /// A rejected file is reported and the previous pending image is kept.
    pub fn select_file(
        &mut self,
        file: SelectedFile,
        status: &mut StatusReporter,
    ) -> Result<&PendingImage, ValidationError> {
        match self.form.ingest.select(file) {
            Ok(pending) => Ok(pending),
            Err(error) => {
                tracing::warn!("Rejected selected file: {}", error);
                status.error(error.to_string());
                Err(error)
            }
        }
    }

    pub fn clear_file(&mut self) {
        self.form.ingest.clear();
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.form.label = label.into();
    }

    /// Whether the submit control is enabled, given the connectivity gate.
    pub fn can_submit(&self, status: &StatusReporter) -> bool {
        status.submission_permitted() && !self.busy.is_busy() && self.form.is_complete()
    }

    /// Check preconditions and create the item.
    ///
    /// The form keeps its contents on failure and a retry action for the
    /// same submission is left with `status`.
    pub async fn submit(
        &mut self,
        session: &Session,
        status: &mut StatusReporter,
    ) -> crate::Result<ItemId> {
        let prepared = check_connected(session, status)
            .and_then(|owner_id| Ok((owner_id, self.form.snapshot()?)));
        let (owner_id, submission) = match prepared {
            Ok(prepared) => prepared,
            Err(error) => {
                status.error(error.to_string());
                return Err(error.into());
            }
        };
        self.create(&owner_id, submission, status).await
    }

    /// Re-run a failed submission with its original label and image.
    pub async fn retry_submission(
        &mut self,
        submission: PendingSubmission,
        session: &Session,
        status: &mut StatusReporter,
    ) -> crate::Result<ItemId> {
        let owner_id = match check_connected(session, status) {
            Ok(owner_id) => owner_id,
            Err(error) => {
                status.error_with_retry(error.to_string(), RetryAction::Submit(submission));
                return Err(error.into());
            }
        };
        self.create(&owner_id, submission, status).await
    }

    async fn create(
        &mut self,
        owner_id: &str,
        submission: PendingSubmission,
        status: &mut StatusReporter,
    ) -> crate::Result<ItemId> {
        let Some(_busy) = self.busy.acquire() else {
            return Err(FormError::Busy.into());
        };
        status.info("Saving...");

        let result = self
            .store
            .create(owner_id, &submission.label, &submission.image)
            .await;
        match result {
            Ok(id) => {
                if self.form.holds(&submission) {
                    self.form.clear();
                }
                tracing::info!("Saved wardrobe item {}", id);
                status.success("Item saved!");
                Ok(id)
            }
            Err(error) => {
                tracing::warn!("Failed to save wardrobe item: {}", error);
                status.report_store_error(
                    "Failed to save item",
                    &error,
                    Some(RetryAction::Submit(submission)),
                );
                Err(error.into())
            }
        }
    }
}

fn check_connected(session: &Session, status: &StatusReporter) -> Result<String, FormError> {
    if !status.submission_permitted() {
        return Err(FormError::Offline);
    }
    session
        .uid()
        .map(ToString::to_string)
        .ok_or(FormError::NotAuthenticated)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ingest::DEFAULT_MAX_IMAGE_BYTES;
    use crate::state::Connectivity;
    use crate::store::{MemoryItemStore, StoreError, StoreOperation};
    use crate::Error;

    fn guest() -> Session {
        Session::Anonymous {
            uid: "guest-1".to_string(),
        }
    }

    fn cat() -> SelectedFile {
        SelectedFile::new("cat.jpg", "image/jpeg", vec![7; 200_000])
    }

    fn controller() -> (Arc<MemoryItemStore>, FormController<MemoryItemStore>) {
        let store = Arc::new(MemoryItemStore::new());
        (store.clone(), FormController::new(store, DEFAULT_MAX_IMAGE_BYTES))
    }

    #[tokio::test]
    async fn submit_creates_item_and_clears_form() {
        let (store, mut form) = controller();
        let mut status = StatusReporter::default();
        form.select_file(cat(), &mut status).unwrap();
        form.set_label("  Blue Shirt ");

        let id = form.submit(&guest(), &mut status).await.unwrap();
        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
        assert_eq!(items[0].label, "Blue Shirt");
        assert_eq!(items[0].owner_id, "guest-1");
        assert!(form.form().pending_image().is_none());
        assert_eq!(form.form().label(), "");
        assert_eq!(status.message().unwrap().text, "Item saved!");
        assert!(!form.busy_flag().is_busy());
    }

    #[tokio::test]
    async fn preconditions_short_circuit_in_order() {
        let (store, mut form) = controller();
        let mut status = StatusReporter::default();
        status.set_connectivity(Connectivity::Offline);

        let error = form.submit(&Session::LoggedOut, &mut status).await.unwrap_err();
        assert!(matches!(error, Error::Form(FormError::Offline)));

        status.set_connectivity(Connectivity::Online);
        let error = form.submit(&Session::LoggedOut, &mut status).await.unwrap_err();
        assert!(matches!(error, Error::Form(FormError::NotAuthenticated)));
        assert_eq!(
            status.message().unwrap().text,
            "You must be logged in to save items."
        );

        form.set_label("Blue Shirt");
        let error = form.submit(&guest(), &mut status).await.unwrap_err();
        assert!(matches!(error, Error::Form(FormError::MissingImage)));

        form.set_label("   ");
        form.select_file(cat(), &mut status).unwrap();
        let error = form.submit(&guest(), &mut status).await.unwrap_err();
        assert!(matches!(error, Error::Form(FormError::EmptyLabel)));

        assert!(store.items().is_empty());
        assert!(status.retry_action().is_none());
    }

    #[tokio::test]
    async fn failed_create_keeps_form_and_offers_same_submission() {
        let (store, mut form) = controller();
        let mut status = StatusReporter::default();
        form.select_file(cat(), &mut status).unwrap();
        form.set_label("Blue Shirt");
        let expected = form.form().snapshot().unwrap();

        store.fail_next(StoreOperation::Create, StoreError::Unavailable);
        let error = form.submit(&guest(), &mut status).await.unwrap_err();
        assert!(matches!(error, Error::Store(StoreError::Unavailable)));
        assert!(form.form().pending_image().is_some());
        assert!(!form.busy_flag().is_busy());
        assert_eq!(
            status.retry_action(),
            Some(&RetryAction::Submit(expected.clone()))
        );

        // The retry re-applies the snapshot even after the label changed.
        form.set_label("Something else");
        let Some(RetryAction::Submit(submission)) = status.take_retry() else {
            panic!("expected submit retry");
        };
        form.retry_submission(submission, &guest(), &mut status)
            .await
            .unwrap();
        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "Blue Shirt");
        assert_eq!(items[0].image_data, expected.image);
        assert_eq!(form.form().label(), "Something else");
    }

    #[tokio::test]
    async fn can_submit_follows_connectivity_and_validity() {
        let (_store, mut form) = controller();
        let mut status = StatusReporter::default();
        assert!(!form.can_submit(&status));

        form.select_file(cat(), &mut status).unwrap();
        form.set_label("Hat");
        assert!(form.can_submit(&status));

        status.set_connectivity(Connectivity::Offline);
        assert!(!form.can_submit(&status));

        form.set_label("");
        status.set_connectivity(Connectivity::Online);
        assert!(!form.can_submit(&status));
        form.set_label("Hat");
        assert!(form.can_submit(&status));
    }

    #[test]
    fn rejected_file_is_reported_and_leaves_form_empty() {
        let (_store, mut form) = controller();
        let mut status = StatusReporter::default();
        let error = form
            .select_file(
                SelectedFile::new("notes.txt", "text/plain", b"hi".to_vec()),
                &mut status,
            )
            .unwrap_err();
        assert!(matches!(error, ValidationError::InvalidType { .. }));
        assert!(form.form().pending_image().is_none());
        assert!(status.message().is_some());
        form.set_label("Hat");
        assert!(!form.can_submit(&status));
    }

    #[test]
    fn busy_flag_rejects_reentry_and_releases_on_drop() {
        let flag = BusyFlag::default();
        let guard = flag.acquire().unwrap();
        assert!(flag.is_busy());
        assert!(flag.acquire().is_none());
        drop(guard);
        assert!(!flag.is_busy());
    }

    #[test]
    fn reset_session_discards_pending_state() {
        let (_store, mut form) = controller();
        let mut status = StatusReporter::default();
        form.select_file(cat(), &mut status).unwrap();
        form.set_label("Hat");
        form.reset_session();
        assert!(form.form().pending_image().is_none());
        assert_eq!(form.form().label(), "");
    }
}
