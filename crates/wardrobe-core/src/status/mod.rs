//! User-facing status line, retry slot and connectivity gate.

use std::time::{Duration, Instant};

use crate::auth::AuthError;
use crate::form::PendingSubmission;
use crate::models::{ItemId, SignInMethod};
use crate::state::Connectivity;
use crate::store::StoreError;

/// Auto-clear delay for success and plain error messages.
pub const DEFAULT_AUTO_CLEAR: Duration = Duration::from_secs(5);

pub const OFFLINE_BANNER: &str = "You are offline. Changes cannot be saved until you reconnect.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
    pub retryable: bool,
    shown_at: Instant,
}

impl StatusMessage {
    /// Messages that stay until superseded have no deadline.
    fn deadline(&self, auto_clear: Duration) -> Option<Instant> {
        match self.kind {
            StatusKind::Info => None,
            StatusKind::Error if self.retryable => None,
            StatusKind::Success | StatusKind::Error => Some(self.shown_at + auto_clear),
        }
    }
}

/// A failed operation that can be re-run from the retry control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAction {
    /// Re-create the item from the exact label and image that failed
    Submit(PendingSubmission),
    Resubscribe { owner_id: String },
    Delete(ItemId),
    SignIn(SignInMethod),
    SignOut,
}

/// Map a backend error code to user-facing text.
pub fn describe_error_code(code: &str) -> String {
    let code = code.trim();
    match code.strip_prefix("auth/").unwrap_or(code) {
        "unavailable" | "network-request-failed" => {
            "Connection failed. Check your internet connection.".to_string()
        }
        "permission-denied" => "Access denied.".to_string(),
        "popup-closed-by-user" | "cancelled-popup-request" => "Login cancelled.".to_string(),
        _ => format!("Something went wrong ({code})."),
    }
}

/// Holds the current status message and at most one retry action.
///
/// The retry action belongs to the message it was reported with; any newer
/// message replaces both.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    auto_clear: Duration,
    message: Option<StatusMessage>,
    retry: Option<RetryAction>,
    connectivity: Connectivity,
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_CLEAR)
    }
}

impl StatusReporter {
    pub const fn new(auto_clear: Duration) -> Self {
        Self {
            auto_clear,
            message: None,
            retry: None,
            connectivity: Connectivity::Online,
        }
    }

    fn show(&mut self, kind: StatusKind, text: impl Into<String>, retry: Option<RetryAction>) {
        self.message = Some(StatusMessage {
            kind,
            text: text.into(),
            retryable: retry.is_some(),
            shown_at: Instant::now(),
        });
        self.retry = retry;
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.show(StatusKind::Success, text, None);
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.show(StatusKind::Info, text, None);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.show(StatusKind::Error, text, None);
    }

    pub fn error_with_retry(&mut self, text: impl Into<String>, retry: RetryAction) {
        self.show(StatusKind::Error, text, Some(retry));
    }

    /// Report a store failure. `NotFound` is always final.
    pub fn report_store_error(
        &mut self,
        context: &str,
        error: &StoreError,
        retry: Option<RetryAction>,
    ) {
        let text = format!("{context}: {}", describe_error_code(error.code()));
        let retry = retry.filter(|_| *error != StoreError::NotFound);
        self.show(StatusKind::Error, text, retry);
    }

    /// Report an identity provider failure. Cancellation is dismissed without retry.
    pub fn report_auth_error(&mut self, error: &AuthError, retry: RetryAction) {
        let text = describe_error_code(error.code());
        if error.is_cancellation() {
            self.show(StatusKind::Error, text, None);
        } else {
            self.show(StatusKind::Error, text, Some(retry));
        }
    }

    pub const fn message(&self) -> Option<&StatusMessage> {
        self.message.as_ref()
    }

    pub const fn retry_action(&self) -> Option<&RetryAction> {
        self.retry.as_ref()
    }

    /// Remove the retry action together with its message.
    pub fn take_retry(&mut self) -> Option<RetryAction> {
        let retry = self.retry.take()?;
        self.message = None;
        Some(retry)
    }

    pub fn clear(&mut self) {
        self.message = None;
        self.retry = None;
    }

    /// Drop an auto-clearing message whose interval has elapsed.
    pub fn clear_expired(&mut self, now: Instant) -> bool {
        let expired = self
            .message
            .as_ref()
            .and_then(|message| message.deadline(self.auto_clear))
            .is_some_and(|deadline| now >= deadline);
        if expired {
            self.message = None;
        }
        expired
    }

    pub const fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Record a connectivity change. Returns whether it changed.
    pub fn set_connectivity(&mut self, connectivity: Connectivity) -> bool {
        if self.connectivity == connectivity {
            return false;
        }
        tracing::info!("Connectivity changed: {:?}", connectivity);
        self.connectivity = connectivity;
        true
    }

    pub const fn offline_banner(&self) -> Option<&'static str> {
        match self.connectivity {
            Connectivity::Offline => Some(OFFLINE_BANNER),
            Connectivity::Online => None,
        }
    }

    /// Submission is never permitted while offline.
    pub const fn submission_permitted(&self) -> bool {
        self.connectivity.is_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_fixed_text() {
        assert_eq!(
            describe_error_code("unavailable"),
            "Connection failed. Check your internet connection."
        );
        assert_eq!(describe_error_code("permission-denied"), "Access denied.");
        assert_eq!(
            describe_error_code("auth/popup-closed-by-user"),
            "Login cancelled."
        );
        assert_eq!(
            describe_error_code("resource-exhausted"),
            "Something went wrong (resource-exhausted)."
        );
    }

    #[test]
    fn success_and_plain_error_auto_clear() {
        let mut status = StatusReporter::default();
        status.success("Item saved!");
        let shown = Instant::now();
        assert!(!status.clear_expired(shown));
        assert!(status.clear_expired(shown + Duration::from_secs(6)));
        assert!(status.message().is_none());

        status.error("Nope");
        assert!(status.clear_expired(Instant::now() + Duration::from_secs(6)));
    }

    #[test]
    fn info_and_retryable_errors_persist() {
        let later = Instant::now() + Duration::from_secs(60);
        let mut status = StatusReporter::default();
        status.info("Saving...");
        assert!(!status.clear_expired(later));

        status.error_with_retry("Failed", RetryAction::SignOut);
        assert!(!status.clear_expired(later));
        assert!(status.message().unwrap().retryable);
    }

    #[test]
    fn newer_message_replaces_retry() {
        let mut status = StatusReporter::default();
        status.error_with_retry("First", RetryAction::SignOut);
        status.error_with_retry("Second", RetryAction::SignIn(SignInMethod::Guest));
        assert_eq!(
            status.retry_action(),
            Some(&RetryAction::SignIn(SignInMethod::Guest))
        );

        status.success("Done");
        assert!(status.retry_action().is_none());
    }

    #[test]
    fn not_found_is_reported_without_retry() {
        let mut status = StatusReporter::default();
        let id: ItemId = "gone".parse().unwrap();
        status.report_store_error(
            "Failed to delete item",
            &StoreError::NotFound,
            Some(RetryAction::Delete(id)),
        );
        assert!(status.retry_action().is_none());
        assert_eq!(status.message().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn store_error_keeps_retry_and_describes_code() {
        let mut status = StatusReporter::default();
        status.report_store_error(
            "Failed to save item",
            &StoreError::Unavailable,
            Some(RetryAction::SignOut),
        );
        assert_eq!(
            status.message().unwrap().text,
            "Failed to save item: Connection failed. Check your internet connection."
        );
        assert_eq!(status.take_retry(), Some(RetryAction::SignOut));
        assert!(status.message().is_none());
        assert!(status.take_retry().is_none());
    }

    #[test]
    fn auth_cancellation_is_not_retryable() {
        let mut status = StatusReporter::default();
        status.report_auth_error(
            &AuthError::from_code("auth/popup-closed-by-user", "closed"),
            RetryAction::SignIn(SignInMethod::Provider),
        );
        assert_eq!(status.message().unwrap().text, "Login cancelled.");
        assert!(status.retry_action().is_none());

        status.report_auth_error(
            &AuthError::from_code("auth/network-request-failed", "offline"),
            RetryAction::SignIn(SignInMethod::Provider),
        );
        assert!(status.retry_action().is_some());
    }

    #[test]
    fn connectivity_toggles_banner_and_gate() {
        let mut status = StatusReporter::default();
        assert!(status.submission_permitted());
        assert!(status.set_connectivity(Connectivity::Offline));
        assert!(!status.set_connectivity(Connectivity::Offline));
        assert_eq!(status.offline_banner(), Some(OFFLINE_BANNER));
        assert!(!status.submission_permitted());

        status.set_connectivity(Connectivity::Online);
        assert!(status.offline_banner().is_none());
    }
}
