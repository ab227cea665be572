//! Integration tests for the session synchronizer and guards
//!
//! A scripted `MockClient` stands in for the external OIDC client: tests
//! decide what `init` and `update_token` return and fire lifecycle events
//! by hand through the handler the session registered.

use async_trait::async_trait;
use auth_session::auth::{ClaimRoles, RoleQuery};
use auth_session::client::{AuthClient, ClientEvent, SharedEventHandler};
use auth_session::guards::{Fallback, Outcome, Protect, RoleGuard};
use auth_session::types::InitOptions;
use auth_session::{
    AuthSession, FnSessionObserver, MIN_TOKEN_VALIDITY, Result, SessionError, SessionOptions,
    SessionState, SignInTrigger, User,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Test fixtures
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn token_for(payload: &Value) -> String {
    let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
    format!("eyJhbGciOiJSUzI1NiJ9.{body}.signature")
}

fn ada_token() -> String {
    token_for(&json!({
        "sub": "u1",
        "given_name": "A",
        "family_name": "B",
        "realm_access": {"roles": ["user"]},
        "resource_access": {"web": {"roles": ["admin"]}}
    }))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Login(Option<String>),
    Logout(Option<String>),
    Register(Option<String>),
}

#[derive(Default)]
struct MockState {
    token: Option<String>,
    id_token: Option<String>,
    handler: Option<SharedEventHandler>,
    calls: Vec<Call>,
    update_validity: Vec<Duration>,
}

struct MockClient {
    init_result: std::result::Result<bool, String>,
    refresh_fails: bool,
    init_delay: Option<Duration>,
    roles: Option<ClaimRoles>,
    init_calls: AtomicU32,
    state: Mutex<MockState>,
}

impl MockClient {
    fn new(init_result: std::result::Result<bool, String>) -> Self {
        Self {
            init_result,
            refresh_fails: false,
            init_delay: None,
            roles: None,
            init_calls: AtomicU32::new(0),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Client that restores an existing session for `ada_token()`
    fn signed_in() -> Self {
        let token = ada_token();
        let claims = auth_session::auth::extract_claims(&token).unwrap();
        let client = Self {
            roles: Some(ClaimRoles::new(claims, "web")),
            ..Self::new(Ok(true))
        };
        client.set_tokens(Some(token), Some("id.token.value".to_string()));
        client
    }

    fn set_tokens(&self, token: Option<String>, id_token: Option<String>) {
        let mut state = self.state.lock().unwrap();
        state.token = token;
        state.id_token = id_token;
    }

    fn emit(&self, event: ClientEvent) {
        let handler = self.state.lock().unwrap().handler.clone();
        if let Some(handler) = handler {
            handler.handle(event);
        }
    }

    fn handler(&self) -> Option<SharedEventHandler> {
        self.state.lock().unwrap().handler.clone()
    }

    fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn refresh_requests(&self) -> Vec<Duration> {
        self.state.lock().unwrap().update_validity.clone()
    }

    fn init_count(&self) -> u32 {
        self.init_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthClient for MockClient {
    async fn init(&self, _options: &InitOptions) -> Result<bool> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        // Stay pending for a few polls so concurrent callers overlap
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        if let Some(delay) = self.init_delay {
            tokio::time::sleep(delay).await;
        }
        self.init_result.clone().map_err(SessionError::client)
    }

    async fn login(&self, redirect_uri: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Login(redirect_uri.map(str::to_string)));
        Ok(())
    }

    async fn logout(&self, redirect_uri: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Logout(redirect_uri.map(str::to_string)));
        Ok(())
    }

    async fn register(&self, redirect_uri: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::Register(redirect_uri.map(str::to_string)));
        Ok(())
    }

    async fn update_token(&self, min_validity: Duration) -> Result<bool> {
        self.state
            .lock()
            .unwrap()
            .update_validity
            .push(min_validity);
        if self.refresh_fails {
            Err(SessionError::client("refresh token rejected"))
        } else {
            Ok(true)
        }
    }

    fn token(&self) -> Option<String> {
        self.state.lock().unwrap().token.clone()
    }

    fn id_token(&self) -> Option<String> {
        self.state.lock().unwrap().id_token.clone()
    }

    fn roles(&self) -> Option<&dyn RoleQuery> {
        self.roles.as_ref().map(|r| r as &dyn RoleQuery)
    }

    fn set_event_handler(&self, handler: Option<SharedEventHandler>) {
        self.state.lock().unwrap().handler = handler;
    }
}

/// Observer that records every notification
#[derive(Default)]
struct Recorder {
    changes: Mutex<Vec<(bool, Option<String>)>>,
    expired: AtomicU32,
    init_errors: Mutex<Vec<String>>,
}

impl Recorder {
    fn observer(self: &Arc<Self>) -> FnSessionObserver {
        let changes = Arc::clone(self);
        let expired = Arc::clone(self);
        let errors = Arc::clone(self);
        FnSessionObserver::new()
            .with_auth_state_change(move |signed_in, user: Option<&User>| {
                changes
                    .changes
                    .lock()
                    .unwrap()
                    .push((signed_in, user.map(|u| u.id.to_string())));
            })
            .with_token_expired(move || {
                expired.expired.fetch_add(1, Ordering::SeqCst);
            })
            .with_init_error(move |err| {
                errors.init_errors.lock().unwrap().push(err.to_string());
            })
    }

    fn changes(&self) -> Vec<(bool, Option<String>)> {
        self.changes.lock().unwrap().clone()
    }
}

fn session_with(client: &Arc<MockClient>, recorder: &Arc<Recorder>) -> AuthSession {
    init_tracing();
    let options = SessionOptions::builder()
        .observer(Arc::new(recorder.observer()))
        .build();
    AuthSession::new(Arc::clone(client) as Arc<dyn AuthClient>, options)
}

// ============================================================================
// Initialization
// ============================================================================

#[tokio::test]
async fn test_init_unauthenticated_settles_signed_out() {
    let client = Arc::new(MockClient::new(Ok(false)));
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);

    assert!(session.snapshot().is_loading);
    let state = session.initialize().await;

    assert_eq!(state, SessionState::Unauthenticated);
    let snapshot = session.snapshot();
    assert!(!snapshot.is_loading);
    assert!(!snapshot.is_authenticated);
    assert!(snapshot.user.is_none());
    assert!(snapshot.access_token.is_none());
    assert_eq!(recorder.changes(), vec![(false, None)]);
}

#[tokio::test]
async fn test_init_authenticated_projects_user() {
    let client = Arc::new(MockClient::signed_in());
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);

    assert_eq!(session.initialize().await, SessionState::Authenticated);

    let snapshot = session.snapshot();
    assert!(!snapshot.is_loading);
    assert!(snapshot.is_authenticated);
    let user = snapshot.user.as_ref().unwrap();
    assert_eq!(user.id.as_str(), "u1");
    assert_eq!(user.first_name.as_deref(), Some("A"));
    assert_eq!(user.last_name.as_deref(), Some("B"));
    assert_eq!(snapshot.access_token, Some(ada_token()));
    assert_eq!(snapshot.id_token.as_deref(), Some("id.token.value"));
    assert_eq!(recorder.changes(), vec![(true, Some("u1".to_string()))]);
}

#[tokio::test]
async fn test_init_failure_is_terminal_and_reported_once() {
    let client = Arc::new(MockClient::new(Err("realm not found".to_string())));
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);

    assert_eq!(session.initialize().await, SessionState::Unauthenticated);
    assert_eq!(session.initialize().await, SessionState::Unauthenticated);

    let snapshot = session.snapshot();
    assert!(!snapshot.is_loading);
    assert!(!snapshot.is_authenticated);
    assert_eq!(client.init_count(), 1);

    let errors = recorder.init_errors.lock().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("realm not found"));
    assert_eq!(recorder.changes(), vec![(false, None)]);
}

#[tokio::test]
async fn test_initialize_dropped_midway_settles_signed_out() {
    init_tracing();
    let client = Arc::new(MockClient {
        init_delay: Some(Duration::from_millis(200)),
        ..MockClient::new(Ok(true))
    });
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);

    let attempt = tokio::time::timeout(Duration::from_millis(10), session.initialize()).await;
    assert!(attempt.is_err());

    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, SessionState::Unauthenticated);
    assert!(!snapshot.is_loading);
    assert!(!snapshot.is_authenticated);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(session.initialize().await, SessionState::Unauthenticated);
    assert_eq!(client.init_count(), 1);

    assert_eq!(recorder.changes(), vec![(false, None)]);
    let errors = recorder.init_errors.lock().unwrap().clone();
    assert_eq!(errors, vec![SessionError::Cancelled.to_string()]);

    // Client events still reach the settled session
    client.emit(ClientEvent::AuthSuccess);
    assert_eq!(session.state(), SessionState::Authenticated);
}

#[tokio::test]
async fn test_duplicate_initialize_runs_client_init_once() {
    let client = Arc::new(MockClient::new(Ok(false)));
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);

    let (a, b, c) = tokio::join!(
        session.initialize(),
        session.initialize(),
        session.initialize()
    );
    assert_eq!(a, SessionState::Unauthenticated);
    // Overlapping calls return while the first is still in flight
    assert_eq!(b, SessionState::Initializing);
    assert_eq!(c, SessionState::Initializing);

    session.initialize().await;
    assert_eq!(client.init_count(), 1);
    assert_eq!(recorder.changes().len(), 1);
}

// ============================================================================
// Lifecycle events
// ============================================================================

#[tokio::test]
async fn test_token_expiry_signs_out_without_refresh() {
    let client = Arc::new(MockClient::signed_in());
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.initialize().await;

    client.emit(ClientEvent::TokenExpired);

    let snapshot = session.snapshot();
    assert!(!snapshot.is_authenticated);
    assert!(snapshot.user.is_none());
    assert!(snapshot.access_token.is_none());
    assert_eq!(session.state(), SessionState::Unauthenticated);
    assert!(client.refresh_requests().is_empty());
    assert_eq!(recorder.expired.load(Ordering::SeqCst), 1);
    assert_eq!(
        recorder.changes(),
        vec![(true, Some("u1".to_string())), (false, None)]
    );
}

#[tokio::test]
async fn test_login_and_logout_events_republish() {
    let client = Arc::new(MockClient::new(Ok(false)));
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.initialize().await;

    let mut rx = session.subscribe();
    rx.borrow_and_update();

    client.set_tokens(Some(ada_token()), None);
    client.emit(ClientEvent::AuthSuccess);
    assert!(rx.has_changed().unwrap());
    let snapshot = rx.borrow_and_update().clone();
    assert!(snapshot.is_authenticated);
    assert_eq!(snapshot.user.as_ref().unwrap().display_name(), "A B");

    client.set_tokens(None, None);
    client.emit(ClientEvent::AuthLogout);
    let snapshot = rx.borrow_and_update().clone();
    assert!(!snapshot.is_authenticated);
    assert!(snapshot.user.is_none());

    assert_eq!(
        recorder.changes(),
        vec![(false, None), (true, Some("u1".to_string())), (false, None)]
    );
}

#[tokio::test]
async fn test_snapshots_are_replaced_not_mutated() {
    let client = Arc::new(MockClient::signed_in());
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.initialize().await;

    let before = session.snapshot();
    client.emit(ClientEvent::AuthLogout);
    let after = session.snapshot();

    assert!(before.is_authenticated);
    assert_eq!(before.user.as_ref().unwrap().id.as_str(), "u1");
    assert!(!after.is_authenticated);
    assert!(!Arc::ptr_eq(&before, &after));
}

// ============================================================================
// Operations
// ============================================================================

#[tokio::test]
async fn test_get_token_requests_minimum_validity() {
    let client = Arc::new(MockClient::signed_in());
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.initialize().await;

    assert_eq!(session.get_token().await, Some(ada_token()));
    assert_eq!(client.refresh_requests(), vec![MIN_TOKEN_VALIDITY]);
    assert_eq!(MIN_TOKEN_VALIDITY, Duration::from_secs(30));
}

#[tokio::test]
async fn test_get_token_resolves_none_when_refresh_fails() {
    let client = Arc::new(MockClient {
        refresh_fails: true,
        ..MockClient::signed_in()
    });
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.initialize().await;

    assert_eq!(session.get_token().await, None);
    assert!(session.snapshot().is_authenticated);
}

#[tokio::test]
async fn test_sign_in_out_up_delegate_with_redirect() {
    let client = Arc::new(MockClient::new(Ok(false)));
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.initialize().await;

    session.sign_in(Some("https://app/after")).await.unwrap();
    session.sign_up(None).await.unwrap();
    session.sign_out(Some("https://app/bye")).await.unwrap();

    assert_eq!(
        client.calls(),
        vec![
            Call::Login(Some("https://app/after".to_string())),
            Call::Register(None),
            Call::Logout(Some("https://app/bye".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_dispose_detaches_and_ignores_late_events() {
    let client = Arc::new(MockClient::signed_in());
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.initialize().await;

    let stale_handler = client.handler().unwrap();
    session.dispose();
    session.dispose();

    assert!(client.handler().is_none());
    assert_eq!(session.state(), SessionState::Disposed);

    stale_handler.handle(ClientEvent::AuthLogout);
    assert!(session.snapshot().is_authenticated);
    assert_eq!(recorder.changes().len(), 1);

    assert!(matches!(
        session.sign_in(None).await,
        Err(SessionError::Disposed)
    ));
    assert_eq!(session.get_token().await, None);
    assert_eq!(session.initialize().await, SessionState::Disposed);
}

#[tokio::test]
async fn test_initialize_after_dispose_never_calls_client() {
    let client = Arc::new(MockClient::new(Ok(true)));
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.dispose();

    assert_eq!(session.initialize().await, SessionState::Disposed);
    assert_eq!(client.init_count(), 0);
}

// ============================================================================
// Guards against a live session
// ============================================================================

#[tokio::test]
async fn test_protect_while_loading() {
    let client = Arc::new(MockClient::new(Ok(false)));
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);

    let guard = Protect::new().loading("spinner");
    assert_eq!(
        guard.evaluate(&session, "secret"),
        Outcome::Loading(Some("spinner"))
    );
}

#[tokio::test]
async fn test_protect_signed_out_without_fallback_starts_sign_in() {
    let client = Arc::new(MockClient::new(Ok(false)));
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.initialize().await;

    let guard = Protect::new().redirect_uri("https://app/protected");
    assert_eq!(guard.evaluate(&session, "secret"), Outcome::SignIn);

    let rendered = guard.render(&session, "secret").await.unwrap();
    assert_eq!(rendered, None);
    assert_eq!(
        client.calls(),
        vec![Call::Login(Some("https://app/protected".to_string()))]
    );
}

#[tokio::test]
async fn test_protect_static_fallback_wins_without_side_effect() {
    let client = Arc::new(MockClient::new(Ok(false)));
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.initialize().await;

    let guard = Protect::new().fallback(Fallback::Static("please sign in"));
    let rendered = guard.render(&session, "secret").await.unwrap();
    assert_eq!(rendered, Some("please sign in"));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_protect_dynamic_fallback_receives_working_trigger() {
    let client = Arc::new(MockClient::new(Ok(false)));
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.initialize().await;

    let captured: Arc<Mutex<Option<SignInTrigger>>> = Arc::new(Mutex::new(None));
    let guard = Protect::new()
        .redirect_uri("https://app/back")
        .fallback(Fallback::dynamic({
            let captured = Arc::clone(&captured);
            move |trigger: SignInTrigger| {
                *captured.lock().unwrap() = Some(trigger);
                "sign-in button".to_string()
            }
        }));

    let outcome = guard.evaluate(&session, "secret".to_string());
    assert_eq!(outcome, Outcome::Fallback("sign-in button".to_string()));
    assert!(client.calls().is_empty());

    let trigger = captured.lock().unwrap().take().unwrap();
    assert_eq!(trigger.redirect_uri(), Some("https://app/back"));
    trigger.fire().await.unwrap();
    assert_eq!(
        client.calls(),
        vec![Call::Login(Some("https://app/back".to_string()))]
    );
}

#[tokio::test]
async fn test_protect_role_guard_against_client_roles() {
    let client = Arc::new(MockClient::signed_in());
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.initialize().await;

    let admin = Protect::new().role_guard(
        RoleGuard::builder()
            .resource_roles(vec!["admin".to_string()])
            .build(),
    );
    assert_eq!(admin.evaluate(&session, "panel"), Outcome::Show("panel"));

    let auditors = Protect::new()
        .role_guard(
            RoleGuard::builder()
                .resource_roles(vec!["auditor".to_string()])
                .build(),
        )
        .fallback(Fallback::Static("forbidden"));
    assert_eq!(
        auditors.evaluate(&session, "panel"),
        Outcome::Forbidden(Some("forbidden"))
    );

    assert!(session.has_realm_role("user"));
    assert!(session.has_resource_role("admin", None));
    assert!(!session.has_resource_role("admin", Some("billing")));
}

#[tokio::test]
async fn test_roles_not_held_without_role_capability() {
    let client = Arc::new(MockClient::new(Ok(true)));
    client.set_tokens(Some(ada_token()), None);
    let recorder = Arc::new(Recorder::default());
    let session = session_with(&client, &recorder);
    session.initialize().await;

    assert!(session.snapshot().is_authenticated);
    assert!(!session.has_realm_role("user"));

    let guard = Protect::new().role_guard(
        RoleGuard::builder()
            .realm_roles(vec!["user".to_string()])
            .build(),
    );
    assert_eq!(guard.evaluate(&session, "x"), Outcome::Forbidden(None));
}
