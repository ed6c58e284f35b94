//! Identity and credential types held by the session store.
//!
//! Token strings live in `SecretString` so they stay out of `Debug` output and
//! logs. Expose them only at the point of attachment or persistence.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// User identifier; the API emits numeric ids, identity providers emit strings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum UserId {
    Numeric(u64),
    Text(String),
}

impl Default for UserId {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(formatter, "{id}"),
            Self::Text(id) => formatter.write_str(id),
        }
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// Identity record for the signed-in user. Contains no secrets.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(default, alias = "sub")]
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl User {
    #[must_use]
    pub fn new(id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Minimal identity used when a provider token cannot be decoded.
    #[must_use]
    pub fn placeholder(provider: &str) -> Self {
        Self {
            provider: Some(provider.to_string()),
            ..Self::default()
        }
    }

    /// Name shown in greetings: the name, else the email local part, else "User".
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
            return name.to_string();
        }

        match self.email.split('@').next().map(str::trim) {
            Some(local) if !local.is_empty() => local.to_string(),
            _ => "User".to_string(),
        }
    }
}

/// Credential pair issued at sign-in.
#[derive(Debug)]
pub struct Tokens {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

impl Tokens {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: refresh_token.map(SecretString::from),
        }
    }
}

impl Clone for Tokens {
    fn clone(&self) -> Self {
        Self {
            access_token: clone_secret(&self.access_token),
            refresh_token: self.refresh_token.as_ref().map(clone_secret),
        }
    }
}

/// Snapshot of the client-held session.
#[derive(Debug, Default)]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
}

impl Session {
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.access_token.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            user: self.user.clone(),
            access_token: self.access_token.as_ref().map(clone_secret),
            refresh_token: self.refresh_token.as_ref().map(clone_secret),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Signup-to-verify handoff. Survives restarts until verified or cancelled.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingVerification {
    pub email: String,
}

pub(crate) fn clone_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}
