//! Identity session as reported by the identity provider.

use serde::{Deserialize, Serialize};

/// Current identity of the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Session {
    #[default]
    LoggedOut,
    Anonymous {
        uid: String,
    },
    Authenticated {
        uid: String,
        display_name: Option<String>,
        photo_url: Option<String>,
        email: Option<String>,
    },
}

impl Session {
    /// Owner identifier for a signed-in session.
    pub fn uid(&self) -> Option<&str> {
        match self {
            Self::LoggedOut => None,
            Self::Anonymous { uid } | Self::Authenticated { uid, .. } => Some(uid),
        }
    }

    pub const fn is_signed_in(&self) -> bool {
        !matches!(self, Self::LoggedOut)
    }

    /// Status line shown next to the sign-out control.
    pub fn greeting(&self) -> Option<String> {
        match self {
            Self::LoggedOut => None,
            Self::Anonymous { uid } => Some(format!("Logged in as Guest: {uid}")),
            Self::Authenticated {
                uid,
                display_name,
                email,
                ..
            } => {
                let name = display_name.as_deref().unwrap_or(uid);
                Some(match email {
                    Some(email) => format!("Welcome, {name} ({email})"),
                    None => format!("Welcome, {name}"),
                })
            }
        }
    }
}

/// Sign-in flows offered by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignInMethod {
    /// Interactive consent flow with an external account
    Provider,
    Guest,
}
