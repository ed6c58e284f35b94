//! # authfront
//!
//! Client-side authentication session lifecycle for a remote auth API.
//!
//! The crate owns the part of an auth frontend that has real state: acquiring
//! credentials, persisting them per API origin, attaching them to outbound
//! calls, refreshing them once on a 401, and invalidating them. Screens and
//! forms are collaborators that call into [`client::AuthClient`],
//! [`session::SessionStore`] and [`oauth::GoogleHandoff`].
//!
//! ## Core Flows
//!
//! ### Signup & Email Verification
//!
//! 1. **Signup:** `POST /auth/signup` with `{name, email, password}`. On success the
//!    email is remembered as a pending verification so a restart does not lose it.
//! 2. **Verify:** `POST /auth/verify` with `{email, code}`; the pending entry is
//!    consumed on success.
//!
//! ### Sign-in & Refresh
//!
//! 1. **Sign-in:** `POST /auth/signin` returns `{user, tokens}`, which the caller
//!    hands to [`session::SessionStore::login`].
//! 2. **Attach:** every authenticated call carries `Authorization: Bearer <access>`.
//! 3. **Refresh:** a 401 triggers one `POST /auth/refresh-tokens`; the call is
//!    replayed once with the new token, or the session is dropped locally.
//!
//! ### Google OAuth
//!
//! `GET /auth/google/auth` yields a URL for full-page navigation. The redirect
//! back carries tokens, an authorization code, or an error; see [`oauth`].
//!
//! Token material is held in `SecretString` and must never be logged.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod oauth;
pub mod session;
pub mod storage;

pub use error::{Error, Result};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
