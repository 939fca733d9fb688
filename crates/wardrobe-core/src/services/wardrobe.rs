//! Wires session, gallery, form and status together.

use std::sync::Arc;
use std::time::Instant;

use crate::auth::IdentityProvider;
use crate::config::ClientConfig;
use crate::form::FormController;
use crate::gallery::{GallerySync, GalleryView, HandlerId};
use crate::ingest::{PendingImage, SelectedFile, ValidationError};
use crate::models::{ItemId, Session, SignInMethod};
use crate::state::Connectivity;
use crate::status::{RetryAction, StatusReporter};
use crate::store::ItemStore;
use crate::{Error, Result};

/// One user's wardrobe session against a store and an identity provider.
pub struct WardrobeClient<S, P> {
    identity: P,
    session: Session,
    gallery: GallerySync<S>,
    form: FormController<S>,
    status: StatusReporter,
    store: Arc<S>,
}

impl<S: ItemStore, P: IdentityProvider> WardrobeClient<S, P> {
    pub fn new(store: Arc<S>, identity: P, config: &ClientConfig) -> Self {
        let mut client = Self {
            gallery: GallerySync::new(store.clone()),
            form: FormController::new(store.clone(), config.max_image_bytes()),
            status: StatusReporter::new(config.status_auto_clear()),
            session: Session::LoggedOut,
            identity,
            store,
        };
        let restored = client.identity.current_session();
        client.apply_session(restored);
        client
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn status(&self) -> &StatusReporter {
        &self.status
    }

    pub const fn gallery(&self) -> &GalleryView {
        self.gallery.view()
    }

    pub const fn gallery_sync(&self) -> &GallerySync<S> {
        &self.gallery
    }

    pub const fn form(&self) -> &FormController<S> {
        &self.form
    }

    /// Whether the app panel (rather than the sign-in panel) is shown.
    pub const fn shows_app(&self) -> bool {
        self.session.is_signed_in()
    }

    /// Follow an identity change reported by the provider.
    ///
    /// An owner change tears down the form session and any remembered
    /// retry, which belonged to the previous owner.
    pub fn apply_session(&mut self, session: Session) {
        if session.uid() != self.session.uid() {
            match session.uid() {
                Some(_) => tracing::info!("Session started"),
                None => tracing::info!("Session ended"),
            }
            self.form.reset_session();
            self.status.clear();
        }
        self.gallery.apply_session(&session);
        self.session = session;
    }

    pub async fn sign_in(&mut self, method: SignInMethod) -> Result<()> {
        match self.identity.sign_in(method).await {
            Ok(session) => {
                self.apply_session(session);
                Ok(())
            }
            Err(error) => {
                tracing::warn!("Sign-in failed: {}", error);
                self.status
                    .report_auth_error(&error, RetryAction::SignIn(method));
                Err(error.into())
            }
        }
    }

    pub async fn sign_in_with_provider(&mut self) -> Result<()> {
        self.sign_in(SignInMethod::Provider).await
    }

    pub async fn sign_in_as_guest(&mut self) -> Result<()> {
        self.sign_in(SignInMethod::Guest).await
    }

    pub async fn sign_out(&mut self) -> Result<()> {
        match self.identity.sign_out().await {
            Ok(()) => {
                self.apply_session(Session::LoggedOut);
                Ok(())
            }
            Err(error) => {
                tracing::warn!("Sign-out failed: {}", error);
                self.status.report_auth_error(&error, RetryAction::SignOut);
                Err(error.into())
            }
        }
    }

    pub fn select_file(
        &mut self,
        file: SelectedFile,
    ) -> std::result::Result<&PendingImage, ValidationError> {
        self.form.select_file(file, &mut self.status)
    }

    pub fn clear_file(&mut self) {
        self.form.clear_file();
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.form.set_label(label);
    }

    pub fn submit_enabled(&self) -> bool {
        self.form.can_submit(&self.status)
    }

    pub async fn submit(&mut self) -> Result<ItemId> {
        self.form.submit(&self.session, &mut self.status).await
    }

    /// Delete through a rendered row's bound handler.
    pub async fn delete_row(&mut self, handler: HandlerId) -> Result<()> {
        let id = self.gallery.resolve_delete(handler).ok_or_else(|| {
            Error::InvalidInput(format!("delete handler {handler} is no longer bound"))
        })?;
        self.delete_item(&id).await
    }

    pub async fn delete_item(&mut self, id: &ItemId) -> Result<()> {
        match self.store.delete(id).await {
            Ok(()) => {
                tracing::info!("Deleted wardrobe item {}", id);
                self.status.success("Item deleted!");
                Ok(())
            }
            Err(error) => {
                tracing::warn!("Failed to delete wardrobe item {}: {}", id, error);
                self.status.report_store_error(
                    "Failed to delete item",
                    &error,
                    Some(RetryAction::Delete(id.clone())),
                );
                Err(error.into())
            }
        }
    }

    /// Re-run the remembered failed operation. Returns `Ok(false)` when
    /// there was nothing to retry.
    pub async fn retry(&mut self) -> Result<bool> {
        let Some(action) = self.status.take_retry() else {
            return Ok(false);
        };
        match action {
            RetryAction::Submit(submission) => {
                self.form
                    .retry_submission(submission, &self.session, &mut self.status)
                    .await?;
            }
            RetryAction::Resubscribe { owner_id } => {
                if self.session.uid() == Some(owner_id.as_str()) {
                    self.gallery.subscribe(&owner_id);
                } else {
                    tracing::debug!("Dropping resubscribe retry for a previous session");
                }
            }
            RetryAction::Delete(id) => self.delete_item(&id).await?,
            RetryAction::SignIn(method) => self.sign_in(method).await?,
            RetryAction::SignOut => self.sign_out().await?,
        }
        Ok(true)
    }

    pub fn set_connectivity(&mut self, connectivity: Connectivity) {
        self.status.set_connectivity(connectivity);
    }

    /// Render every gallery delivery queued so far.
    pub fn pump(&mut self) -> usize {
        self.gallery.pump(&mut self.status)
    }

    /// Wait for and render the next gallery delivery.
    pub async fn next_delivery(&mut self) -> bool {
        self.gallery.next(&mut self.status).await
    }

    /// Expire auto-clearing status messages.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.status.clear_expired(now)
    }
}
