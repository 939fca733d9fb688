//! Identity provider boundary.
//!
//! Sign-in, guest access and sign-out are delegated to an external
//! provider; this module only models its results and failures.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use uuid::Uuid;

use crate::models::{Session, SignInMethod};

const CANCELLATION_CODES: [&str; 2] = ["popup-closed-by-user", "cancelled-popup-request"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Sign-in was cancelled ({code})")]
    Cancelled { code: String },
    #[error("Auth provider error ({code}): {message}")]
    Provider { code: String, message: String },
}

impl AuthError {
    /// Classify a provider error code, e.g. `auth/popup-closed-by-user`.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let code = code.trim().to_string();
        let bare = code.strip_prefix("auth/").unwrap_or(&code);
        if CANCELLATION_CODES.contains(&bare) {
            Self::Cancelled { code }
        } else {
            Self::Provider {
                code,
                message: message.into(),
            }
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Cancelled { code } | Self::Provider { code, .. } => code,
        }
    }

    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// External identity provider.
pub trait IdentityProvider: Send + Sync {
    /// Run a sign-in flow and return the resulting session.
    fn sign_in(&self, method: SignInMethod) -> impl Future<Output = AuthResult<Session>> + Send;

    fn sign_out(&self) -> impl Future<Output = AuthResult<()>> + Send;

    fn current_session(&self) -> Session;
}

#[derive(Debug, Default)]
struct ProviderState {
    session: Session,
    account: Option<Session>,
    pending_errors: Vec<AuthError>,
}

/// In-process identity provider with a configurable account.
///
/// Guest sign-in mints a fresh uid; provider sign-in yields the configured
/// account. Queued errors fail the next flows in order.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account returned by the interactive consent flow.
    pub fn with_account(account: Session) -> Self {
        let provider = Self::default();
        provider.lock().account = Some(account);
        provider
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_next(&self, error: AuthError) {
        self.lock().pending_errors.push(error);
    }

    fn take_error(&self) -> Option<AuthError> {
        let mut state = self.lock();
        if state.pending_errors.is_empty() {
            None
        } else {
            Some(state.pending_errors.remove(0))
        }
    }

    fn sign_in_now(&self, method: SignInMethod) -> AuthResult<Session> {
        if let Some(error) = self.take_error() {
            return Err(error);
        }
        let mut state = self.lock();
        let session = match method {
            SignInMethod::Guest => Session::Anonymous {
                uid: Uuid::now_v7().simple().to_string(),
            },
            SignInMethod::Provider => state.account.clone().ok_or_else(|| AuthError::Provider {
                code: "auth/operation-not-allowed".to_string(),
                message: "no account is configured for this provider".to_string(),
            })?,
        };
        state.session = session.clone();
        Ok(session)
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in(&self, method: SignInMethod) -> AuthResult<Session> {
        self.sign_in_now(method)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        if let Some(error) = self.take_error() {
            return Err(error);
        }
        self.lock().session = Session::LoggedOut;
        Ok(())
    }

    fn current_session(&self) -> Session {
        self.lock().session.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_code_detects_cancellation() {
        assert!(AuthError::from_code("auth/popup-closed-by-user", "").is_cancellation());
        assert!(AuthError::from_code("cancelled-popup-request", "").is_cancellation());
        let error = AuthError::from_code("auth/network-request-failed", "offline");
        assert!(!error.is_cancellation());
        assert_eq!(error.code(), "auth/network-request-failed");
    }

    #[tokio::test]
    async fn guest_sign_in_mints_unique_uids() {
        let provider = MemoryIdentityProvider::new();
        let first = provider.sign_in(SignInMethod::Guest).await.unwrap();
        let second = provider.sign_in(SignInMethod::Guest).await.unwrap();
        assert_ne!(first.uid(), second.uid());
        assert_eq!(provider.current_session(), second);
    }

    #[tokio::test]
    async fn provider_sign_in_returns_account() {
        let account = Session::Authenticated {
            uid: "u1".to_string(),
            display_name: Some("Ada".to_string()),
            photo_url: None,
            email: None,
        };
        let provider = MemoryIdentityProvider::with_account(account.clone());
        assert_eq!(
            provider.sign_in(SignInMethod::Provider).await.unwrap(),
            account
        );

        provider.sign_out().await.unwrap();
        assert_eq!(provider.current_session(), Session::LoggedOut);
    }

    #[tokio::test]
    async fn queued_errors_fail_next_flow() {
        let provider = MemoryIdentityProvider::new();
        provider.fail_next(AuthError::from_code("auth/popup-closed-by-user", "closed"));
        assert!(provider.sign_in(SignInMethod::Guest).await.is_err());
        assert!(provider.sign_in(SignInMethod::Guest).await.is_ok());
    }
}
