//! Session state: who is signed in and which credential to present.
//!
//! `SessionStore` is the only component that touches durable storage. It keeps
//! the in-memory session and the persisted copy in step, and enforces that an
//! access token and a user identity are set and cleared together.
//!
//! States: `Anonymous --login--> Authenticated`, `Authenticated --logout-->
//! Anonymous`, `Authenticated --refresh ok--> Authenticated`, and
//! `Authenticated --refresh failed--> Anonymous` (driven by the auth client).

mod store;
mod types;

pub use store::{RemoteSignOut, SessionStore};
pub use types::{PendingVerification, Session, SessionState, Tokens, User, UserId};

/// Persisted layout. Each key is independently present or absent.
pub mod keys {
    pub const USER: &str = "user";
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const PENDING_VERIFICATION_EMAIL: &str = "pendingVerificationEmail";
    pub const OAUTH_STATE: &str = "oauthState";
    /// Written by older clients; only ever removed.
    pub const LEGACY_ID_TOKEN: &str = "idToken";
}
