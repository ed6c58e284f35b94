//! Request and response payloads for the auth API. Requests carry passwords and
//! codes and responses carry tokens, so none of these may be logged.

use crate::session::{Tokens, User};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Serialize, Deserialize)]
pub struct SignupProfile {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Form-side confirmation; checked locally and never sent.
    #[serde(skip)]
    pub confirm_password: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
    #[serde(skip)]
    pub confirm_password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignOutRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<&'a str>,
}

impl fmt::Debug for SignupProfile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SignupProfile")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ResetPasswordRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ResetPasswordRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Token set as issued by the API. Older deployments capitalize field names.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    #[serde(alias = "AccessToken", alias = "access_token")]
    pub access_token: String,
    #[serde(default, alias = "RefreshToken", alias = "refresh_token")]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("TokenSet([REDACTED])")
    }
}

impl From<TokenSet> for Tokens {
    fn from(set: TokenSet) -> Self {
        Self {
            access_token: SecretString::from(set.access_token),
            refresh_token: set.refresh_token.map(SecretString::from),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SignInResponse {
    pub user: User,
    pub tokens: TokenSet,
}

impl SignInResponse {
    /// Splits the response into what [`crate::session::SessionStore::login`] takes.
    #[must_use]
    pub fn into_parts(self) -> (User, Tokens) {
        (self.user, self.tokens.into())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Acknowledgement body; the API is free to return more than a message.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GoogleAuthUrlResponse {
    #[serde(alias = "auth_url", alias = "url")]
    pub auth_url: String,
}
