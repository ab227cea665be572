//! Auth Session Demo
//!
//! Drives an `AuthSession` over an in-memory client:
//! 1. Initialize (restores a signed-in session)
//! 2. Read the user and roles from the snapshot
//! 3. Fetch an access token
//! 4. Expire the token and watch the session sign out
//! 5. Sign in again
//!
//! Run with: cargo run --example session_demo

use async_trait::async_trait;
use auth_session::auth::{ClaimRoles, RoleQuery, extract_claims};
use auth_session::client::{AuthClient, ClientEvent, SharedEventHandler};
use auth_session::guards::{Outcome, Protect, RoleGuard};
use auth_session::types::InitOptions;
use auth_session::{AuthSession, FnSessionObserver, Result, SessionOptions};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Client that keeps its tokens in memory and signs in instantly
struct MemoryClient {
    token: String,
    roles: Option<ClaimRoles>,
    signed_in: Mutex<bool>,
    handler: Mutex<Option<SharedEventHandler>>,
}

impl MemoryClient {
    fn new() -> Self {
        let payload = serde_json::json!({
            "sub": "7f3c",
            "name": "Grace Hopper",
            "email": "grace@example.com",
            "realm_access": {"roles": ["user"]},
            "resource_access": {"web": {"roles": ["admin"]}}
        });
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        let token = format!("eyJhbGciOiJub25lIn0.{body}.demo");
        let roles = extract_claims(&token).map(|claims| ClaimRoles::new(claims, "web"));
        Self {
            token,
            roles,
            signed_in: Mutex::new(true),
            handler: Mutex::new(None),
        }
    }

    fn emit(&self, event: ClientEvent) {
        let handler = self.handler.lock().ok().and_then(|h| h.clone());
        if let Some(handler) = handler {
            handler.handle(event);
        }
    }

    fn set_signed_in(&self, value: bool) {
        if let Ok(mut signed_in) = self.signed_in.lock() {
            *signed_in = value;
        }
    }

    fn is_signed_in(&self) -> bool {
        self.signed_in.lock().map(|s| *s).unwrap_or(false)
    }
}

#[async_trait]
impl AuthClient for MemoryClient {
    async fn init(&self, _options: &InitOptions) -> Result<bool> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(self.is_signed_in())
    }

    async fn login(&self, redirect_uri: Option<&str>) -> Result<()> {
        println!("   → login (redirect: {redirect_uri:?})");
        self.set_signed_in(true);
        self.emit(ClientEvent::AuthSuccess);
        Ok(())
    }

    async fn logout(&self, _redirect_uri: Option<&str>) -> Result<()> {
        self.set_signed_in(false);
        self.emit(ClientEvent::AuthLogout);
        Ok(())
    }

    async fn register(&self, _redirect_uri: Option<&str>) -> Result<()> {
        Ok(())
    }

    async fn update_token(&self, _min_validity: Duration) -> Result<bool> {
        Ok(false)
    }

    fn token(&self) -> Option<String> {
        self.is_signed_in().then(|| self.token.clone())
    }

    fn id_token(&self) -> Option<String> {
        None
    }

    fn roles(&self) -> Option<&dyn RoleQuery> {
        self.roles.as_ref().map(|r| r as &dyn RoleQuery)
    }

    fn set_event_handler(&self, handler: Option<SharedEventHandler>) {
        if let Ok(mut slot) = self.handler.lock() {
            *slot = handler;
        }
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_session=debug".parse().unwrap()),
        )
        .init();

    println!("=== Auth Session Demo ===");
    println!();

    let client = Arc::new(MemoryClient::new());
    let options = SessionOptions::builder()
        .observer(Arc::new(
            FnSessionObserver::new()
                .with_auth_state_change(|signed_in, user| {
                    println!(
                        "   [observer] signed in: {signed_in}, user: {}",
                        user.map(|u| u.display_name()).unwrap_or_default()
                    );
                })
                .with_token_expired(|| println!("   [observer] token expired")),
        ))
        .build();
    let session = AuthSession::new(Arc::clone(&client) as Arc<dyn AuthClient>, options);

    println!("1. Initializing...");
    let state = session.initialize().await;
    println!("   state: {state:?}");
    println!();

    println!("2. Snapshot:");
    let snapshot = session.snapshot();
    if let Some(user) = &snapshot.user {
        println!("   user: {} ({})", user.display_name(), user.initials());
        println!("   email: {:?}", user.email);
    }
    println!("   realm role 'user': {}", session.has_realm_role("user"));
    println!(
        "   resource role 'admin': {}",
        session.has_resource_role("admin", None)
    );
    println!();

    println!("3. Access token:");
    match session.get_token().await {
        Some(token) => println!("   {}", auth_session::utils::redact_token(&token)),
        None => println!("   unavailable"),
    }
    println!();

    let admin_only = Protect::new()
        .role_guard(RoleGuard::builder().resource_roles(vec!["admin".to_string()]).build())
        .redirect_uri("https://app.example.com/admin");

    println!("4. Expiring the token...");
    client.set_signed_in(false);
    client.emit(ClientEvent::TokenExpired);
    println!("   authenticated: {}", session.snapshot().is_authenticated);
    println!();

    println!("5. Rendering an admin-only page while signed out:");
    match admin_only.evaluate(&session, "admin dashboard") {
        Outcome::Show(page) => println!("   showing {page}"),
        Outcome::SignIn => println!("   signed out, sign-in required"),
        other => println!("   {other:?}"),
    }
    let rendered = admin_only.render(&session, "admin dashboard").await?;
    println!("   after automatic sign-in: {rendered:?}");
    println!("   authenticated: {}", session.snapshot().is_authenticated);

    session.dispose();
    Ok(())
}
