//! Best-effort identity extraction from an unverified JWT payload.
//!
//! The signature is not checked: the server already vouched for the token by
//! issuing it, and the result is only used for display. Any decoding problem
//! yields `None` and the caller falls back to a placeholder identity.

use crate::session::{User, UserId};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{de::DeserializeOwned, Deserialize};

#[derive(Debug, Deserialize)]
struct IdentityClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, rename = "cognito:username")]
    cognito_username: Option<String>,
}

fn b64d_json<T: DeserializeOwned>(segment: &str) -> Option<T> {
    let bytes = Base64UrlUnpadded::decode_vec(segment.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Decodes the payload segment of `token` into a display identity.
///
/// Returns `None` when the token is not three dot-separated segments, the
/// payload is not base64url JSON, or it names neither a subject nor an email.
#[must_use]
pub fn decode_identity(token: &str) -> Option<User> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    let claims: IdentityClaims = b64d_json(payload)?;
    if claims.sub.is_none() && claims.email.is_none() {
        return None;
    }

    Some(User {
        id: claims.sub.map(UserId::Text).unwrap_or_default(),
        email: claims.email.unwrap_or_default(),
        name: claims.name,
        provider: None,
        username: claims.username.or(claims.cognito_username),
    })
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &serde_json::Value) -> String {
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
    format!("{header}.{payload}.signature")
}
