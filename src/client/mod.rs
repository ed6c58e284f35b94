//! Client for the fixed set of auth API endpoints.
//!
//! Every call except signup, signin, forgot-password and reset-password carries
//! the current access token as a bearer credential. When such a call comes
//! back 401, the client exchanges the refresh token once and replays the call
//! once with the new token. If the exchange fails the session is dropped
//! locally and the original 401 is returned. No call is replayed twice.
//!
//! Refreshes are single-flight: a call whose 401 arrives after another call
//! already rotated the token just replays with the new one.

mod types;
pub mod validate;

pub use types::{
    Ack, Credentials, ForgotPasswordRequest, ResetPasswordRequest, SignInResponse, SignupProfile,
    TokenSet, VerifyEmailRequest, VerifyResponse,
};

use crate::{
    config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT},
    error::{Error, Result},
    session::{RemoteSignOut, SessionStore, Tokens, User},
    storage::FileStore,
    APP_USER_AGENT,
};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use types::{GoogleAuthUrlResponse, RefreshRequest, SignOutRequest};
use url::Url;

pub mod endpoints {
    pub const SIGNUP: &str = "/auth/signup";
    pub const SIGNIN: &str = "/auth/signin";
    pub const VERIFY: &str = "/auth/verify";
    pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
    pub const RESET_PASSWORD: &str = "/auth/reset-password";
    pub const REFRESH_TOKENS: &str = "/auth/refresh-tokens";
    pub const GOOGLE_AUTH: &str = "/auth/google/auth";
    pub const GOOGLE_CALLBACK: &str = "/auth/google/callback";
    pub const HEALTH: &str = "/auth/health";
    pub const SIGN_OUT: &str = "/auth/signout";
}

/// Whether a call carries the bearer credential (and may be replayed after a refresh).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Access {
    Public,
    Bearer,
}

#[derive(Clone, Debug)]
pub struct AuthClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: Arc<SessionStore>,
    refresh_gate: Arc<Mutex<()>>,
}

impl AuthClient {
    /// Builds a client sharing `session` with the rest of the application.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig, session: Arc<SessionStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("{APP_USER_AGENT} ({})", crate::GIT_COMMIT_HASH))
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .build()
            .map_err(|err| Error::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            config,
            session,
            refresh_gate: Arc::new(Mutex::new(())),
        })
    }

    /// Opens the file-backed session for the configured origin, restores it and
    /// builds a client around it.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the HTTP client cannot be constructed.
    pub fn open(config: ClientConfig) -> Result<Self> {
        let storage = FileStore::new(&config.storage_dir, &config.origin_key());
        debug!(path = %storage.path().display(), "using session storage");
        let session = Arc::new(SessionStore::new(Arc::new(storage)));
        session.restore();
        Self::new(config, session)
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Creates a pending account and remembers the email for verification.
    ///
    /// # Errors
    /// [`Error::Validation`] for bad input (local or remote), [`Error::Conflict`]
    /// when the email is already registered, or any transport error.
    #[instrument(skip_all)]
    pub async fn signup(&self, profile: &SignupProfile) -> Result<Ack> {
        validate::required("Name", &profile.name)?;
        validate::email(&profile.email)?;
        validate::required("Password", &profile.password)?;
        validate::confirmation(&profile.password, profile.confirm_password.as_deref())?;

        let profile = SignupProfile {
            name: profile.name.trim().to_string(),
            email: profile.email.trim().to_string(),
            ..profile.clone()
        };
        let ack = self
            .call(Method::POST, endpoints::SIGNUP, Some(&profile), Access::Public)
            .await?;

        if let Err(err) = self.session.begin_verification(&profile.email) {
            warn!("signup succeeded but pending verification was not saved: {err}");
        }
        Ok(ack)
    }

    /// Exchanges credentials for a user and token set. The caller decides
    /// whether to hand the result to [`SessionStore::login`].
    ///
    /// # Errors
    /// [`Error::Auth`] on bad credentials, [`Error::Validation`] on bad input.
    #[instrument(skip_all)]
    pub async fn signin(&self, credentials: &Credentials) -> Result<SignInResponse> {
        validate::email(&credentials.email)?;
        validate::required("Password", &credentials.password)?;

        let credentials = Credentials {
            email: credentials.email.trim().to_string(),
            password: credentials.password.clone(),
        };
        self.call(Method::POST, endpoints::SIGNIN, Some(&credentials), Access::Public)
            .await
    }

    /// Confirms a pending account and consumes the matching pending entry.
    ///
    /// # Errors
    /// [`Error::Auth`] when the code is wrong or expired.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<VerifyResponse> {
        validate::email(email)?;
        validate::required("Verification code", code)?;

        let request = VerifyEmailRequest {
            email: email.trim().to_string(),
            code: code.trim().to_string(),
        };
        let response = self
            .call(Method::POST, endpoints::VERIFY, Some(&request), Access::Bearer)
            .await?;

        if self
            .session
            .pending_verification()
            .is_some_and(|pending| pending.email.eq_ignore_ascii_case(&request.email))
        {
            self.session.complete_verification();
        }
        Ok(response)
    }

    /// Requests a reset code. Remote rejections that could reveal whether the
    /// account exists, validation ones included, are reported as success.
    ///
    /// # Errors
    /// [`Error::Validation`] for a locally malformed email, rate limiting, or
    /// transport and server failures.
    #[instrument(skip_all)]
    pub async fn forgot_password(&self, email: &str) -> Result<Ack> {
        validate::email(email)?;

        let request = ForgotPasswordRequest {
            email: email.trim().to_string(),
        };
        match self
            .call(Method::POST, endpoints::FORGOT_PASSWORD, Some(&request), Access::Public)
            .await
        {
            Err(Error::Auth { status, .. }) if status != 429 => {
                debug!(status, "masking forgot-password rejection");
                Ok(Ack::default())
            }
            Err(Error::Validation(_)) => {
                debug!("masking forgot-password validation rejection");
                Ok(Ack::default())
            }
            other => other,
        }
    }

    /// # Errors
    /// [`Error::Auth`] on a bad or expired code, [`Error::Validation`] on bad input.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<Ack> {
        validate::email(&request.email)?;
        validate::required("Verification code", &request.code)?;
        validate::required("New password", &request.new_password)?;
        validate::confirmation(&request.new_password, request.confirm_password.as_deref())?;

        let request = ResetPasswordRequest {
            email: request.email.trim().to_string(),
            code: request.code.trim().to_string(),
            ..request.clone()
        };
        self.call(Method::POST, endpoints::RESET_PASSWORD, Some(&request), Access::Public)
            .await
    }

    /// Exchanges the stored refresh token for a new access token. Any failure
    /// drops the local session.
    ///
    /// # Errors
    /// [`Error::Auth`] when there is no refresh token or the server rejects it,
    /// or the transport error that prevented the exchange.
    #[instrument(skip_all)]
    pub async fn refresh_tokens(&self) -> Result<()> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_exclusive().await
    }

    /// Refreshes after `rejected` drew a 401, unless another call already
    /// replaced it while this one waited for the gate.
    async fn refresh_after_rejection(&self, rejected: Option<&SecretString>) -> Result<()> {
        let _gate = self.refresh_gate.lock().await;
        let current = self.session.access_token();
        if let (Some(current), Some(rejected)) = (&current, rejected) {
            if current.expose_secret() != rejected.expose_secret() {
                debug!("access token already refreshed by another call");
                return Ok(());
            }
        }
        self.refresh_exclusive().await
    }

    async fn refresh_exclusive(&self) -> Result<()> {
        let presented = self.session.refresh_token();
        let result = self.exchange_refresh_token(presented.as_ref()).await;
        if let Err(err) = &result {
            let current = self.session.refresh_token();
            if same_secret(presented.as_ref(), current.as_ref()) {
                warn!("token refresh failed, signing out locally: {err}");
                self.session.logout_local();
            } else {
                debug!("refresh token changed during a failed refresh, keeping session");
            }
        }
        result
    }

    async fn exchange_refresh_token(&self, refresh_token: Option<&SecretString>) -> Result<()> {
        let refresh_token = refresh_token
            .ok_or_else(|| Error::unauthorized("Your session has expired. Please sign in again."))?;

        let request = RefreshRequest {
            refresh_token: refresh_token.expose_secret(),
        };
        // Goes through `send`, never `call`: a refresh is never itself refreshed.
        let text = self
            .send(Method::POST, endpoints::REFRESH_TOKENS, Some(&request), None)
            .await?;
        let tokens: TokenSet = decode(&text)?;

        self.session.apply_refresh(
            SecretString::from(tokens.access_token),
            tokens.refresh_token.map(SecretString::from),
        )
    }

    /// Returns the provider URL the caller must navigate the whole page to.
    ///
    /// # Errors
    /// Transport errors, or [`Error::Parse`] if the URL is missing or invalid.
    #[instrument(skip_all)]
    pub async fn google_auth_url(&self) -> Result<Url> {
        let response: GoogleAuthUrlResponse = self
            .call(Method::GET, endpoints::GOOGLE_AUTH, None::<&()>, Access::Bearer)
            .await?;

        Url::parse(response.auth_url.trim())
            .map_err(|err| Error::Parse(format!("Invalid authorization URL: {err}")))
    }

    /// Trades an OAuth authorization code for tokens (and possibly a user).
    ///
    /// # Errors
    /// [`Error::Auth`] when the code is rejected, [`Error::Parse`] when the
    /// response carries no access token.
    #[instrument(skip_all)]
    pub async fn exchange_google_code(
        &self,
        code: &str,
        state: Option<&str>,
    ) -> Result<(Option<User>, Tokens)> {
        let mut path = String::from(endpoints::GOOGLE_CALLBACK);
        {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            query.append_pair("code", code);
            if let Some(state) = state {
                query.append_pair("state", state);
            }
            path.push('?');
            path.push_str(&query.finish());
        }

        let body: Value = self
            .call(Method::GET, &path, None::<&()>, Access::Bearer)
            .await?;

        let user = body
            .get("user")
            .filter(|user| !user.is_null())
            .map(|user| serde_json::from_value::<User>(user.clone()))
            .transpose()?;
        let tokens: TokenSet = match body.get("tokens") {
            Some(tokens) => serde_json::from_value(tokens.clone())?,
            None => serde_json::from_value(body)?,
        };
        Ok((user, tokens.into()))
    }

    /// # Errors
    /// Transport or server errors.
    #[instrument(skip_all)]
    pub async fn health(&self) -> Result<Value> {
        self.call(Method::GET, endpoints::HEALTH, None::<&()>, Access::Bearer)
            .await
    }

    /// Invalidates the session on the server. Local state is untouched; use
    /// [`SessionStore::logout_global`] for the full logout.
    ///
    /// # Errors
    /// Transport or server errors.
    #[instrument(skip_all)]
    pub async fn sign_out(&self) -> Result<()> {
        let refresh_token = self.session.refresh_token();
        let request = SignOutRequest {
            refresh_token: refresh_token.as_ref().map(ExposeSecret::expose_secret),
        };
        let _: Ack = self
            .call(Method::POST, endpoints::SIGN_OUT, Some(&request), Access::Bearer)
            .await?;
        Ok(())
    }

    /// Sends a call and applies the single refresh-and-retry rule.
    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>, access: Access) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bearer = match access {
            Access::Bearer => self.session.access_token(),
            Access::Public => None,
        };

        let text = match self.send(method.clone(), path, body, bearer.as_ref()).await {
            Err(err) if access == Access::Bearer && err.is_unauthorized() => {
                debug!(path, "unauthorized, attempting token refresh");
                if self.refresh_after_rejection(bearer.as_ref()).await.is_err() {
                    return Err(err);
                }
                let bearer = self.session.access_token();
                self.send(method, path, body, bearer.as_ref()).await?
            }
            result => result?,
        };

        decode(&text)
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        bearer: Option<&SecretString>,
    ) -> Result<String>
    where
        B: Serialize + ?Sized,
    {
        let url = self.config.endpoint(path)?;
        let mut request = self.http.request(method, url);

        if let Some(token) = bearer {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            Ok(text)
        } else {
            debug!(path, status = status.as_u16(), "request rejected");
            Err(Error::from_status(status.as_u16(), &text))
        }
    }
}

impl RemoteSignOut for AuthClient {
    async fn sign_out_remote(&self) -> Result<()> {
        self.sign_out().await
    }
}

fn same_secret(left: Option<&SecretString>, right: Option<&SecretString>) -> bool {
    left.map(ExposeSecret::expose_secret) == right.map(ExposeSecret::expose_secret)
}

/// Decodes a success body; an empty body reads as an empty object.
fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    let text = text.trim();
    let text = if text.is_empty() { "{}" } else { text };
    Ok(serde_json::from_str(text)?)
}
