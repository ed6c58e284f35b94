#![allow(clippy::unwrap_used, clippy::expect_used)]

use authfront::{
    client::{AuthClient, Credentials, ResetPasswordRequest, SignupProfile},
    config::ClientConfig,
    oauth::{CallbackParams, GoogleHandoff, HandoffState},
    session::{keys, SessionStore, Tokens, User},
    storage::{KeyValueStore, MemoryStore},
    Error,
};
use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};
use tokio::{net::TcpListener, task::JoinHandle};

type Reply = (StatusCode, Json<Value>);

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    authorization: Option<String>,
}

/// In-process stand-in for the auth API.
struct MockApi {
    accepted_token: String,
    refresh_works: AtomicBool,
    /// Rotated on every successful refresh.
    refresh_token: Mutex<String>,
    signout_fails: AtomicBool,
    requests: Mutex<Vec<Seen>>,
}

impl MockApi {
    fn accepting(token: &str) -> Self {
        Self {
            accepted_token: token.to_string(),
            refresh_works: AtomicBool::new(true),
            refresh_token: Mutex::new("r1".to_string()),
            signout_fails: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, path: &str, headers: &HeaderMap) {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(Seen {
            path: path.to_string(),
            authorization,
        });
    }

    fn calls(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|seen| seen.path == path)
            .count()
    }

    fn authorizations(&self, path: &str) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|seen| seen.path == path)
            .map(|seen| seen.authorization.clone())
            .collect()
    }
}

fn reply(status: StatusCode, body: Value) -> Reply {
    (status, Json(body))
}

fn google_token(email: &str) -> String {
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"RS256"}"#);
    let claims = json!({"sub": "google_42", "email": email, "username": "Google_42"});
    let payload = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
    format!("{header}.{payload}.sig")
}

async fn signup(State(api): State<Arc<MockApi>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    api.record("/auth/signup", &headers);
    if body["email"] == "taken@b.com" {
        reply(StatusCode::CONFLICT, json!({"error": "User already exists"}))
    } else {
        reply(StatusCode::CREATED, json!({"message": "Verification code sent"}))
    }
}

async fn signin(State(api): State<Arc<MockApi>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    api.record("/auth/signin", &headers);
    if body["email"] == "a@b.com" && body["password"] == "pw" {
        reply(
            StatusCode::OK,
            json!({
                "user": {"id": 1, "email": "a@b.com", "name": "Ann"},
                "tokens": {"accessToken": "t1", "refreshToken": "r1"}
            }),
        )
    } else {
        reply(StatusCode::UNAUTHORIZED, json!({"error": "Invalid email or password"}))
    }
}

async fn verify(State(api): State<Arc<MockApi>>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    api.record("/auth/verify", &headers);
    if body["code"] == "123456" {
        reply(StatusCode::OK, json!({"message": "Email verified"}))
    } else {
        reply(StatusCode::BAD_REQUEST, json!({"error": "Invalid verification code"}))
    }
}

async fn forgot_password(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    api.record("/auth/forgot-password", &headers);
    if body["email"] == "busy@b.com" {
        reply(StatusCode::TOO_MANY_REQUESTS, json!({"error": "Too many requests"}))
    } else if body["email"] == "unknown@b.com" {
        reply(StatusCode::BAD_REQUEST, json!({"error": "No account for this email"}))
    } else {
        reply(StatusCode::NOT_FOUND, json!({"error": "User not found"}))
    }
}

async fn refresh_tokens(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    api.record("/auth/refresh-tokens", &headers);
    let mut current = api.refresh_token.lock().unwrap();
    if api.refresh_works.load(Ordering::SeqCst) && body["refreshToken"] == current.as_str() {
        *current = "r2".to_string();
        reply(StatusCode::OK, json!({"AccessToken": "t2", "RefreshToken": "r2"}))
    } else {
        reply(StatusCode::UNAUTHORIZED, json!({"error": "Invalid refresh token"}))
    }
}

async fn reset_password(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    api.record("/auth/reset-password", &headers);
    let well_formed = body["email"] == "a@b.com" && body["newPassword"].is_string();
    if well_formed && body["code"] == "654321" {
        reply(StatusCode::OK, json!({"message": "Password reset"}))
    } else {
        reply(StatusCode::UNAUTHORIZED, json!({"error": "Invalid or expired code"}))
    }
}

async fn health(State(api): State<Arc<MockApi>>, headers: HeaderMap) -> Reply {
    api.record("/auth/health", &headers);
    let expected = format!("Bearer {}", api.accepted_token);
    let presented = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    if presented == Some(expected.as_str()) {
        reply(StatusCode::OK, json!({"status": "ok"}))
    } else {
        reply(StatusCode::UNAUTHORIZED, json!({"error": "Unauthorized"}))
    }
}

async fn sign_out(State(api): State<Arc<MockApi>>, headers: HeaderMap) -> Reply {
    api.record("/auth/signout", &headers);
    if api.signout_fails.load(Ordering::SeqCst) {
        reply(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"}))
    } else {
        reply(StatusCode::OK, json!({"message": "Signed out"}))
    }
}

async fn google_auth(State(api): State<Arc<MockApi>>, headers: HeaderMap) -> Reply {
    api.record("/auth/google/auth", &headers);
    reply(
        StatusCode::OK,
        json!({"authUrl": "https://accounts.google.com/o/oauth2/v2/auth?client_id=abc&state=st-1"}),
    )
}

async fn google_callback(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    api.record("/auth/google/callback", &headers);
    match query.get("code").map(String::as_str) {
        Some("good") => reply(
            StatusCode::OK,
            json!({"tokens": {"accessToken": google_token("g@example.com"), "refreshToken": "gr"}}),
        ),
        _ => reply(StatusCode::BAD_REQUEST, json!({"error": "Invalid code"})),
    }
}

struct Harness {
    api: Arc<MockApi>,
    base_url: String,
    client: AuthClient,
    storage: Arc<MemoryStore>,
    server: JoinHandle<()>,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn serve(api: Arc<MockApi>) -> anyhow::Result<(String, JoinHandle<()>)> {
    let app = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/verify", post(verify))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/refresh-tokens", post(refresh_tokens))
        .route("/auth/health", get(health))
        .route("/auth/signout", post(sign_out))
        .route("/auth/google/auth", get(google_auth))
        .route("/auth/google/callback", get(google_callback))
        .with_state(api);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            eprintln!("mock api stopped: {err}");
        }
    });
    Ok((format!("http://{addr}"), server))
}

async fn harness(api: MockApi) -> anyhow::Result<Harness> {
    let api = Arc::new(api);
    let (base_url, server) = serve(api.clone()).await?;

    let storage = Arc::new(MemoryStore::new());
    let session = Arc::new(SessionStore::new(storage.clone()));
    let client = AuthClient::new(ClientConfig::new(&base_url)?, session)?;

    Ok(Harness {
        api,
        base_url,
        client,
        storage,
        server,
    })
}

fn login(harness: &Harness, access: &str) -> anyhow::Result<()> {
    harness
        .client
        .session()
        .login(User::new(1, "a@b.com"), Tokens::new(access, Some("r1".into())))?;
    Ok(())
}

#[tokio::test]
async fn signin_then_login_persists_and_authenticates_calls() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t1")).await?;

    let response = harness
        .client
        .signin(&Credentials {
            email: "a@b.com".into(),
            password: "pw".into(),
        })
        .await?;
    let (user, tokens) = response.into_parts();
    harness.client.session().login(user, tokens)?;

    assert!(harness.client.session().is_authenticated());
    assert_eq!(harness.storage.get(keys::ACCESS_TOKEN)?, Some("t1".into()));
    assert_eq!(harness.storage.get(keys::REFRESH_TOKEN)?, Some("r1".into()));
    assert!(harness
        .storage
        .get(keys::USER)?
        .is_some_and(|user| user.contains("a@b.com")));

    let status = harness.client.health().await?;
    assert_eq!(status["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_an_auth_error_with_server_message() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t1")).await?;

    let result = harness
        .client
        .signin(&Credentials {
            email: "a@b.com".into(),
            password: "nope".into(),
        })
        .await;

    assert_eq!(
        result.err(),
        Some(Error::Auth {
            status: 401,
            message: "Invalid email or password".into()
        })
    );
    assert_eq!(harness.api.calls("/auth/refresh-tokens"), 0);
    assert!(!harness.client.session().is_authenticated());
    Ok(())
}

#[tokio::test]
async fn bearer_is_attached_only_to_authenticated_calls() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t1")).await?;
    login(&harness, "t1")?;

    harness.client.forgot_password("someone@b.com").await?;
    harness.client.health().await?;

    assert_eq!(harness.api.authorizations("/auth/forgot-password"), vec![None]);
    assert_eq!(
        harness.api.authorizations("/auth/health"),
        vec![Some("Bearer t1".to_string())]
    );
    Ok(())
}

#[tokio::test]
async fn expired_token_is_refreshed_and_call_retried_once() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t2")).await?;
    login(&harness, "stale")?;

    let status = harness.client.health().await?;
    assert_eq!(status["status"], "ok");

    assert_eq!(harness.api.calls("/auth/refresh-tokens"), 1);
    assert_eq!(
        harness.api.authorizations("/auth/health"),
        vec![Some("Bearer stale".to_string()), Some("Bearer t2".to_string())]
    );
    assert_eq!(harness.api.authorizations("/auth/refresh-tokens"), vec![None]);
    assert_eq!(harness.storage.get(keys::ACCESS_TOKEN)?, Some("t2".into()));
    assert_eq!(harness.storage.get(keys::REFRESH_TOKEN)?, Some("r2".into()));
    assert_eq!(harness.client.session().user(), Some(User::new(1, "a@b.com")));
    Ok(())
}

#[tokio::test]
async fn failed_refresh_returns_original_error_and_signs_out() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t2")).await?;
    harness.api.refresh_works.store(false, Ordering::SeqCst);
    login(&harness, "stale")?;

    let result = harness.client.health().await;

    assert_eq!(
        result.err(),
        Some(Error::Auth {
            status: 401,
            message: "Unauthorized".into()
        })
    );
    assert_eq!(harness.api.calls("/auth/health"), 1);
    assert_eq!(harness.api.calls("/auth/refresh-tokens"), 1);
    assert!(!harness.client.session().is_authenticated());
    assert_eq!(harness.storage.get(keys::ACCESS_TOKEN)?, None);
    assert_eq!(harness.storage.get(keys::USER)?, None);
    Ok(())
}

#[tokio::test]
async fn retried_call_is_never_retried_again() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("never-issued")).await?;
    login(&harness, "stale")?;

    let result = harness.client.health().await;

    assert!(matches!(result, Err(err) if err.is_unauthorized()));
    assert_eq!(harness.api.calls("/auth/health"), 2);
    assert_eq!(harness.api.calls("/auth/refresh-tokens"), 1);
    Ok(())
}

#[tokio::test]
async fn forgot_password_masks_unknown_accounts_but_not_rate_limits() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t1")).await?;

    let ack = harness.client.forgot_password("ghost@b.com").await?;
    assert!(ack.message.is_none());

    let ack = harness.client.forgot_password("unknown@b.com").await?;
    assert!(ack.message.is_none());

    let result = harness.client.forgot_password("busy@b.com").await;
    assert!(matches!(result, Err(Error::Auth { status: 429, .. })));
    assert_eq!(harness.api.calls("/auth/forgot-password"), 3);
    Ok(())
}

#[tokio::test]
async fn reset_password_accepts_valid_code_and_rejects_others() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t1")).await?;
    login(&harness, "t1")?;

    let request = |code: &str| ResetPasswordRequest {
        email: " a@b.com ".into(),
        code: code.into(),
        new_password: "Secret2!".into(),
        confirm_password: Some("Secret2!".into()),
    };

    let ack = harness.client.reset_password(&request("654321")).await?;
    assert_eq!(ack.message.as_deref(), Some("Password reset"));

    let rejected = harness.client.reset_password(&request("000000")).await;
    assert_eq!(
        rejected.err(),
        Some(Error::Auth {
            status: 401,
            message: "Invalid or expired code".into()
        })
    );

    assert_eq!(
        harness.api.authorizations("/auth/reset-password"),
        vec![None, None]
    );
    assert_eq!(harness.api.calls("/auth/refresh-tokens"), 0);
    assert!(harness.client.session().is_authenticated());
    Ok(())
}

#[tokio::test]
async fn signin_sends_trimmed_email() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t1")).await?;

    let response = harness
        .client
        .signin(&Credentials {
            email: "  a@b.com ".into(),
            password: "pw".into(),
        })
        .await?;

    assert_eq!(response.user.email, "a@b.com");
    Ok(())
}

#[tokio::test]
async fn concurrent_unauthorized_calls_share_one_refresh() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t2")).await?;
    login(&harness, "stale")?;

    let (first, second) = tokio::join!(harness.client.health(), harness.client.health());
    first?;
    second?;

    assert_eq!(harness.api.calls("/auth/refresh-tokens"), 1);
    assert!(harness.client.session().is_authenticated());
    assert_eq!(harness.storage.get(keys::ACCESS_TOKEN)?, Some("t2".into()));
    assert_eq!(harness.storage.get(keys::REFRESH_TOKEN)?, Some("r2".into()));
    Ok(())
}

#[tokio::test]
async fn signup_tracks_pending_verification_until_verified() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t1")).await?;
    let session = harness.client.session();

    let conflict = harness
        .client
        .signup(&SignupProfile {
            name: "Ann".into(),
            email: "taken@b.com".into(),
            password: "Secret1!".into(),
            confirm_password: None,
        })
        .await;
    assert_eq!(
        conflict.err(),
        Some(Error::Conflict("User already exists".into()))
    );
    assert!(session.pending_verification().is_none());

    let ack = harness
        .client
        .signup(&SignupProfile {
            name: "Ann".into(),
            email: " new@b.com".into(),
            password: "Secret1!".into(),
            confirm_password: Some("Secret1!".into()),
        })
        .await?;
    assert_eq!(ack.message.as_deref(), Some("Verification code sent"));
    assert_eq!(
        session.pending_verification().map(|pending| pending.email),
        Some("new@b.com".to_string())
    );

    let wrong = harness.client.verify_email("new@b.com", "000000").await;
    assert!(matches!(wrong, Err(Error::Validation(_))));
    assert!(session.pending_verification().is_some());

    harness.client.verify_email("new@b.com", "123456").await?;
    assert!(session.pending_verification().is_none());
    Ok(())
}

#[tokio::test]
async fn global_logout_clears_local_state_when_server_fails() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t1")).await?;
    harness.api.signout_fails.store(true, Ordering::SeqCst);
    login(&harness, "t1")?;

    harness.client.session().logout_global(&harness.client).await;

    assert_eq!(harness.api.calls("/auth/signout"), 1);
    assert_eq!(
        harness.api.authorizations("/auth/signout"),
        vec![Some("Bearer t1".to_string())]
    );
    assert!(!harness.client.session().is_authenticated());
    assert!(harness.storage.keys().is_empty());
    Ok(())
}

#[tokio::test]
async fn google_code_callback_authenticates() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t1")).await?;
    let mut handoff = GoogleHandoff::new(harness.client.clone());

    let url = handoff.begin().await?;
    assert_eq!(url.host_str(), Some("accounts.google.com"));
    assert!(matches!(handoff.state(), HandoffState::AwaitingRedirect { .. }));
    assert_eq!(harness.storage.get(keys::OAUTH_STATE)?, Some("st-1".into()));

    let params = CallbackParams::parse("https://app.example.com/auth/callback?code=good&state=st-1")?;
    let state = handoff.complete(params).await.clone();

    let HandoffState::Authenticated(user) = state else {
        panic!("expected Authenticated, got {state:?}");
    };
    assert_eq!(user.email, "g@example.com");
    assert_eq!(user.provider.as_deref(), Some("google"));
    assert_eq!(harness.storage.get(keys::REFRESH_TOKEN)?, Some("gr".into()));
    assert_eq!(harness.storage.get(keys::OAUTH_STATE)?, None);
    assert!(harness.client.session().is_authenticated());
    Ok(())
}

#[tokio::test]
async fn google_rejected_code_fails_without_credentials() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t1")).await?;
    let mut handoff = GoogleHandoff::new(harness.client.clone());

    let params = CallbackParams::parse("?code=bad")?;
    let state = handoff.complete(params).await;

    assert!(matches!(state, HandoffState::Failed { reason, .. } if reason.contains("Invalid code")));
    assert_eq!(harness.storage.get(keys::ACCESS_TOKEN)?, None);
    assert!(!harness.client.session().is_authenticated());
    Ok(())
}

#[tokio::test]
async fn file_backed_session_survives_restart() -> anyhow::Result<()> {
    let harness = harness(MockApi::accepting("t1")).await?;
    let dir = std::env::temp_dir().join(format!("authfront-test-{}", uuid::Uuid::new_v4()));
    let _guard = DirGuard { path: dir.clone() };
    let config = ClientConfig::new(&harness.base_url)?.with_storage_dir(&dir);

    let client = AuthClient::open(config.clone())?;
    let (user, tokens) = client
        .signin(&Credentials {
            email: "a@b.com".into(),
            password: "pw".into(),
        })
        .await?
        .into_parts();
    client.session().login(user, tokens)?;
    drop(client);

    let reopened = AuthClient::open(config.clone())?;
    assert!(reopened.session().is_authenticated());
    assert_eq!(
        reopened.session().user().map(|user| user.display_name()),
        Some("Ann".to_string())
    );
    reopened.health().await?;

    reopened.session().logout_local();
    let reopened = AuthClient::open(config)?;
    assert!(!reopened.session().is_authenticated());
    Ok(())
}

struct DirGuard {
    path: PathBuf,
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
