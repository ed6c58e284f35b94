use super::{
    keys,
    types::{clone_secret, PendingVerification, Session, SessionState, Tokens, User},
};
use crate::{
    error::{Error, Result},
    storage::{KeyValueStore, MemoryStore},
};
use secrecy::{ExposeSecret, SecretString};
use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, info, warn};

/// Remote half of a global logout.
pub trait RemoteSignOut {
    fn sign_out_remote(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Single source of truth for who is signed in and which credential to present.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    session: Mutex<Session>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SessionStore")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates an empty store over `storage`. Call [`SessionStore::restore`] to
    /// pick up a persisted session.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            session: Mutex::new(Session::default()),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the persisted session into memory and returns it.
    ///
    /// Missing, unreadable, or inconsistent data yields an empty session; it
    /// never fails.
    pub fn restore(&self) -> Session {
        let restored = self.read_persisted().unwrap_or_else(|err| {
            warn!("session storage unreadable, starting anonymous: {err}");
            Session::default()
        });

        debug!(state = ?restored.state(), "session restored");
        *self.lock() = restored.clone();
        restored
    }

    fn read_persisted(&self) -> Result<Session> {
        let user = match self.storage.get(keys::USER)? {
            Some(raw) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(err) => {
                    warn!("ignoring malformed persisted user: {err}");
                    None
                }
            },
            None => None,
        };
        let access_token = self.storage.get(keys::ACCESS_TOKEN)?;
        let refresh_token = self.storage.get(keys::REFRESH_TOKEN)?;

        match (user, access_token) {
            (Some(user), Some(access_token)) => Ok(Session {
                user: Some(user),
                access_token: Some(SecretString::from(access_token)),
                refresh_token: refresh_token.map(SecretString::from),
            }),
            (None, None) if refresh_token.is_none() => Ok(Session::default()),
            _ => {
                warn!("discarding partially persisted session");
                self.purge_credentials();
                Ok(Session::default())
            }
        }
    }

    /// Sets identity and tokens, in memory and in storage. Re-login overwrites.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] if the session cannot be persisted. The
    /// session is then cleared in memory and in storage, so a half-written
    /// record never outlives the failed call.
    pub fn login(&self, user: User, tokens: Tokens) -> Result<()> {
        let user_json = serde_json::to_string(&user)
            .map_err(|err| Error::Storage(format!("Failed to encode user: {err}")))?;

        if let Err(err) = self.persist_login(&user_json, &tokens) {
            warn!("failed to persist session, signing out: {err}");
            self.logout_local();
            return Err(err);
        }

        info!(user_id = %user.id, "signed in");
        *self.lock() = Session {
            user: Some(user),
            access_token: Some(tokens.access_token),
            refresh_token: tokens.refresh_token,
        };
        Ok(())
    }

    fn persist_login(&self, user_json: &str, tokens: &Tokens) -> Result<()> {
        // The access token goes last: a partial write must never pair a new
        // identity with an old token.
        self.storage.remove(keys::ACCESS_TOKEN)?;
        self.storage.set(keys::USER, user_json)?;
        match &tokens.refresh_token {
            Some(refresh) => self.storage.set(keys::REFRESH_TOKEN, refresh.expose_secret())?,
            None => self.storage.remove(keys::REFRESH_TOKEN)?,
        }
        self.storage.remove(keys::LEGACY_ID_TOKEN)?;
        self.storage
            .set(keys::ACCESS_TOKEN, tokens.access_token.expose_secret())
    }

    /// Replaces the access token (and optionally the refresh token) after a
    /// successful refresh. The identity is untouched.
    ///
    /// # Errors
    /// Returns an unauthorized [`Error::Auth`] when no user is signed in, or
    /// [`Error::Storage`] if persisting fails.
    pub fn apply_refresh(
        &self,
        access_token: SecretString,
        refresh_token: Option<SecretString>,
    ) -> Result<()> {
        if self.lock().user.is_none() {
            return Err(Error::unauthorized("No active session to refresh."));
        }

        if let Some(refresh) = &refresh_token {
            self.storage.set(keys::REFRESH_TOKEN, refresh.expose_secret())?;
        }
        self.storage
            .set(keys::ACCESS_TOKEN, access_token.expose_secret())?;

        let mut session = self.lock();
        session.access_token = Some(access_token);
        if refresh_token.is_some() {
            session.refresh_token = refresh_token;
        }
        debug!("access token refreshed");
        Ok(())
    }

    /// Clears the session in memory and in storage. Never fails; storage errors
    /// are logged.
    pub fn logout_local(&self) {
        *self.lock() = Session::default();
        self.purge_credentials();
        info!("signed out locally");
    }

    /// Signs out remotely, then always clears the local session.
    pub async fn logout_global<R: RemoteSignOut>(&self, remote: &R) {
        if let Err(err) = remote.sign_out_remote().await {
            warn!("remote sign-out failed, clearing local session anyway: {err}");
        }
        self.logout_local();
    }

    fn purge_credentials(&self) {
        for key in [
            keys::ACCESS_TOKEN,
            keys::USER,
            keys::REFRESH_TOKEN,
            keys::LEGACY_ID_TOKEN,
        ] {
            if let Err(err) = self.storage.remove(key) {
                warn!("failed to remove {key} from storage: {err}");
            }
        }
    }

    /// True iff an access token is present. Expiry is the server's call.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.lock().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.lock().access_token.as_ref().map(clone_secret)
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.lock().refresh_token.as_ref().map(clone_secret)
    }

    /// Records the email awaiting verification after a successful signup.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] if the entry cannot be persisted.
    pub fn begin_verification(&self, email: &str) -> Result<()> {
        self.storage.set(keys::PENDING_VERIFICATION_EMAIL, email)
    }

    #[must_use]
    pub fn pending_verification(&self) -> Option<PendingVerification> {
        match self.storage.get(keys::PENDING_VERIFICATION_EMAIL) {
            Ok(email) => email
                .filter(|email| !email.trim().is_empty())
                .map(|email| PendingVerification { email }),
            Err(err) => {
                warn!("failed to read pending verification: {err}");
                None
            }
        }
    }

    /// Consumes the pending verification after the code was accepted.
    pub fn complete_verification(&self) {
        self.clear_pending("completed");
    }

    /// Drops the pending verification at the user's request.
    pub fn cancel_verification(&self) {
        self.clear_pending("cancelled");
    }

    fn clear_pending(&self, reason: &str) {
        if let Err(err) = self.storage.remove(keys::PENDING_VERIFICATION_EMAIL) {
            warn!("failed to clear pending verification: {err}");
        } else {
            debug!("pending verification {reason}");
        }
    }

    /// Remembers the `state` parameter of an issued OAuth authorization URL.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] if the value cannot be persisted.
    pub fn remember_oauth_state(&self, state: &str) -> Result<()> {
        self.storage.set(keys::OAUTH_STATE, state)
    }

    /// Returns and forgets the remembered OAuth `state`.
    pub fn take_oauth_state(&self) -> Option<String> {
        let state = match self.storage.get(keys::OAUTH_STATE) {
            Ok(state) => state,
            Err(err) => {
                warn!("failed to read oauth state: {err}");
                return None;
            }
        };
        if state.is_some() {
            if let Err(err) = self.storage.remove(keys::OAUTH_STATE) {
                warn!("failed to clear oauth state: {err}");
            }
        }
        state
    }
}
