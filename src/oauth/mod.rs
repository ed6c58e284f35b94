//! Google sign-in through a full-page redirect.
//!
//! ```text
//! Idle --begin--> AwaitingRedirect --(provider redirects back)--> ProcessingCallback
//! ProcessingCallback --tokens or exchanged code--> Authenticated
//! ProcessingCallback --error / nothing usable / state mismatch--> Failed
//! ```
//!
//! The page reload between the two halves means `complete` usually runs on a
//! fresh handoff in `Idle`; the only thing carried across is the remembered
//! `state` parameter in the session store.
//!
//! A code callback must echo the remembered `state`. A token pair arrives from
//! the API's own redirect after it has checked `state` itself, so there it is
//! only compared when present.

pub mod jwt;

use crate::{
    client::AuthClient,
    error::{Error, Result},
    session::{Tokens, User},
};
use secrecy::ExposeSecret;
use std::{fmt, time::Duration};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use jwt::decode_identity;

pub const PROVIDER: &str = "google";

/// Where a failed handoff sends the user, and after how long.
pub const ENTRY_PATH: &str = "/";
pub const FAILURE_REDIRECT_DELAY: Duration = Duration::from_secs(5);

/// Deferred navigation the caller performs after a failure is shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigation {
    pub to: String,
    pub after: Duration,
}

impl Navigation {
    #[must_use]
    pub fn to_entry() -> Self {
        Self {
            to: ENTRY_PATH.to_string(),
            after: FAILURE_REDIRECT_DELAY,
        }
    }

    /// Sleeps for the bounded delay.
    pub async fn wait(&self) {
        tokio::time::sleep(self.after).await;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandoffState {
    Idle,
    AwaitingRedirect { auth_url: Url },
    ProcessingCallback,
    Authenticated(User),
    Failed { reason: String, navigation: Navigation },
}

/// Query parameters the provider redirect can carry back.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub token: Option<String>,
    pub refresh: Option<String>,
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl fmt::Debug for CallbackParams {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CallbackParams")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh", &self.refresh.as_ref().map(|_| "[REDACTED]"))
            .field("code", &self.code.as_ref().map(|_| "[REDACTED]"))
            .field("state", &self.state)
            .field("error", &self.error)
            .finish()
    }
}

impl CallbackParams {
    /// Reads the callback parameters from a redirect URL. Blank values count
    /// as absent.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "token" => &mut params.token,
                "refresh" => &mut params.refresh,
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                _ => continue,
            };
            slot.get_or_insert_with(|| value.to_string());
        }
        params
    }

    /// Accepts a full callback URL, a path with a query, or a bare query string.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when `raw` is not a URL and not a query.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Ok(url) = Url::parse(raw) {
            return Ok(Self::from_url(&url));
        }

        let query = raw.split_once('?').map_or(raw, |(_, query)| query);
        if !query.contains('=') {
            return Err(Error::Validation(format!("Not a callback URL: {raw}")));
        }
        let mut url = Url::parse("http://callback.invalid/")
            .map_err(|err| Error::Config(format!("Invalid callback base: {err}")))?;
        url.set_query(Some(query));
        Ok(Self::from_url(&url))
    }
}

/// Drives one Google sign-in attempt.
#[derive(Debug)]
pub struct GoogleHandoff {
    client: AuthClient,
    state: HandoffState,
}

impl GoogleHandoff {
    #[must_use]
    pub fn new(client: AuthClient) -> Self {
        Self {
            client,
            state: HandoffState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> &HandoffState {
        &self.state
    }

    /// Fetches the authorization URL and remembers its `state` parameter. The
    /// caller must navigate the whole page to the returned URL.
    ///
    /// # Errors
    /// Any failure to obtain the URL; the handoff stays where it was.
    #[instrument(skip_all)]
    pub async fn begin(&mut self) -> Result<Url> {
        let auth_url = self.client.google_auth_url().await?;

        if let Some((_, state)) = auth_url.query_pairs().find(|(key, _)| key == "state") {
            self.client.session().remember_oauth_state(&state)?;
        }

        debug!(host = auth_url.host_str().unwrap_or_default(), "awaiting provider redirect");
        self.state = HandoffState::AwaitingRedirect {
            auth_url: auth_url.clone(),
        };
        Ok(auth_url)
    }

    /// Processes the provider redirect and lands in `Authenticated` or `Failed`.
    #[instrument(skip_all)]
    pub async fn complete(&mut self, params: CallbackParams) -> &HandoffState {
        self.state = HandoffState::ProcessingCallback;

        self.state = match self.process(params).await {
            Ok(user) => {
                info!(user_id = %user.id, "google sign-in complete");
                HandoffState::Authenticated(user)
            }
            Err(reason) => {
                warn!("google sign-in failed: {reason}");
                HandoffState::Failed {
                    reason,
                    navigation: Navigation::to_entry(),
                }
            }
        };
        &self.state
    }

    async fn process(&self, params: CallbackParams) -> Result<User, String> {
        let session = self.client.session();
        let expected_state = session.take_oauth_state();

        if let Some(error) = params.error {
            return Err(format!("Authentication failed: {error}"));
        }

        if let (Some(expected), Some(received)) = (&expected_state, &params.state) {
            if expected != received {
                return Err("Authentication failed: state mismatch".to_string());
            }
        }

        let (user, tokens) = match (params.token, params.refresh, params.code) {
            (Some(token), Some(refresh), _) => {
                let user = identity_from(&token);
                (user, Tokens::new(token, Some(refresh)))
            }
            (_, _, Some(code)) => {
                if expected_state.is_some() && params.state.is_none() {
                    return Err("Authentication failed: state mismatch".to_string());
                }
                let (user, tokens) = self
                    .client
                    .exchange_google_code(&code, params.state.as_deref())
                    .await
                    .map_err(|err| format!("Authentication failed: {}", err.user_message()))?;
                let user = match user {
                    Some(user) => user,
                    None => identity_from(tokens.access_token.expose_secret()),
                };
                (user, tokens)
            }
            _ => return Err("Authentication failed: No tokens received".to_string()),
        };

        let user = with_provider(user);
        session
            .login(user.clone(), tokens)
            .map_err(|err| format!("Authentication failed: {}", err.user_message()))?;
        Ok(user)
    }
}

fn identity_from(access_token: &str) -> User {
    decode_identity(access_token).unwrap_or_else(|| {
        debug!("access token payload unreadable, using placeholder identity");
        User::placeholder(PROVIDER)
    })
}

fn with_provider(mut user: User) -> User {
    if user.provider.is_none() {
        user.provider = Some(PROVIDER.to_string());
    }
    user
}
