//! `AuthSession`: the session synchronizer
//!
//! Owns the external [`AuthClient`], listens to its lifecycle events and
//! republishes one consistent [`SessionSnapshot`] per transition to any
//! number of observers.
//!
//! # State machine
//!
//! ```text
//!  Uninitialized ──initialize()──→ Initializing ──init Ok(true)──→ Authenticated
//!                                       │                            │     ▲
//!                                       │ init Ok(false) / Err       │     │ AuthSuccess
//!                                       ▼                            ▼     │
//!                                  Unauthenticated ◄── AuthLogout / TokenExpired
//!
//!  any state ──dispose() / Drop──→ Disposed
//! ```
//!
//! **Key Design Points:**
//! - Snapshots are published through a `tokio::sync::watch` channel, so a
//!   reader always sees a whole snapshot
//! - State is guarded by a short `std::sync::Mutex` section that never spans
//!   an `.await` or an observer call
//! - `initialize()` is idempotent: two atomic flags (in progress, completed)
//!   make sure the client's `init` runs at most once per session
//! - Token expiry signs the session out; no silent refresh is attempted
//!
//! # Example
//!
//! ```no_run
//! use auth_session::{AuthClient, AuthSession, SessionOptions};
//! use std::sync::Arc;
//!
//! # async fn example(client: Arc<dyn AuthClient>) -> auth_session::Result<()> {
//! let session = AuthSession::new(client, SessionOptions::default());
//! session.initialize().await;
//!
//! let snapshot = session.snapshot();
//! if !snapshot.is_authenticated {
//!     session.sign_in(Some("https://app.example.com/after-login")).await?;
//! }
//!
//! if let Some(token) = session.get_token().await {
//!     // call your API with `token`
//! #   let _ = token;
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::RoleQuery;
use crate::callbacks::SharedSessionObserver;
use crate::client::{AuthClient, ClientEvent, ClientEventHandler};
use crate::error::{Result, SessionError};
use crate::types::{SessionOptions, SessionSnapshot, SessionState, User};
use crate::utils::redact_token;

/// Minimum remaining access token validity requested by [`AuthSession::get_token`]
pub const MIN_TOKEN_VALIDITY: Duration = Duration::from_secs(30);

/// Mutable session bookkeeping, only touched under the lock
#[derive(Debug)]
struct Core {
    state: SessionState,
    is_loading: bool,
}

/// Notification to deliver once the lock is released
enum Notice {
    StateChange(Arc<SessionSnapshot>),
    Expired(Arc<SessionSnapshot>),
}

struct SessionInner {
    client: Arc<dyn AuthClient>,
    options: SessionOptions,
    core: Mutex<Core>,
    snapshot_tx: watch::Sender<Arc<SessionSnapshot>>,
    init_in_progress: AtomicBool,
    init_completed: AtomicBool,
}

impl SessionInner {
    fn lock(&self) -> MutexGuard<'_, Core> {
        // Core holds plain data; a panic elsewhere cannot leave it torn.
        self.core
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn observer(&self) -> Option<&SharedSessionObserver> {
        self.options.observer.as_ref()
    }

    /// Build the snapshot for `state` from what the client currently holds
    fn capture(&self, state: SessionState, is_loading: bool) -> SessionSnapshot {
        if state == SessionState::Authenticated {
            SessionSnapshot {
                state,
                is_loading,
                is_authenticated: true,
                user: self.client.token_parsed().as_ref().map(User::from_claims),
                id_token: self.client.id_token(),
                access_token: self.client.token(),
            }
        } else {
            SessionSnapshot {
                state,
                is_loading,
                is_authenticated: false,
                user: None,
                id_token: None,
                access_token: None,
            }
        }
    }

    /// Enter `state` and publish its snapshot while holding `core`
    fn transition(&self, core: &mut Core, state: SessionState) -> Arc<SessionSnapshot> {
        let from = core.state;
        core.state = state;
        let snapshot = Arc::new(self.capture(state, core.is_loading));
        self.snapshot_tx.send_replace(Arc::clone(&snapshot));
        debug!(
            ?from,
            to = ?state,
            is_loading = snapshot.is_loading,
            user = snapshot.user.as_ref().map(|u| u.id.as_str()),
            "Session transition"
        );
        snapshot
    }

    fn notify(&self, notice: Notice) {
        let Some(observer) = self.observer() else {
            return;
        };
        match notice {
            Notice::StateChange(snapshot) => {
                observer.on_auth_state_change(snapshot.is_authenticated, snapshot.user.as_ref());
            }
            Notice::Expired(snapshot) => {
                observer.on_auth_state_change(snapshot.is_authenticated, snapshot.user.as_ref());
                observer.on_token_expired();
            }
        }
    }

    fn apply_event(&self, event: ClientEvent) {
        let notice = {
            let mut core = self.lock();
            if !core.state.is_live() {
                debug!(?event, "Ignoring client event after dispose");
                return;
            }
            match event {
                ClientEvent::AuthSuccess => Notice::StateChange(
                    self.transition(&mut core, SessionState::Authenticated),
                ),
                ClientEvent::AuthLogout => Notice::StateChange(
                    self.transition(&mut core, SessionState::Unauthenticated),
                ),
                ClientEvent::TokenExpired => {
                    info!("Access token expired, signing session out");
                    Notice::Expired(self.transition(&mut core, SessionState::Unauthenticated))
                }
            }
        };
        self.notify(notice);
    }

    /// Record the end of the one client `init` and publish its outcome.
    ///
    /// Both outcomes notify the state change; a failure then reports
    /// `on_init_error` with `error`.
    fn settle_init(&self, outcome: Result<bool>) -> SessionState {
        self.init_completed.store(true, Ordering::Release);
        self.init_in_progress.store(false, Ordering::Release);

        let (state, snapshot, failure) = {
            let mut core = self.lock();
            if !core.state.is_live() {
                debug!("Session disposed during initialization");
                return core.state;
            }
            core.is_loading = false;
            match outcome {
                Ok(authenticated) => {
                    let target = if authenticated {
                        SessionState::Authenticated
                    } else {
                        SessionState::Unauthenticated
                    };
                    let snapshot = self.transition(&mut core, target);
                    if let Some(token) = snapshot.access_token.as_deref() {
                        debug!(token = %redact_token(token), "Session restored");
                    }
                    (target, snapshot, None)
                }
                Err(error) => {
                    let snapshot = self.transition(&mut core, SessionState::Unauthenticated);
                    (SessionState::Unauthenticated, snapshot, Some(error))
                }
            }
        };

        self.notify(Notice::StateChange(snapshot));
        if let (Some(error), Some(observer)) = (failure, self.observer()) {
            observer.on_init_error(&error);
        }
        state
    }

    fn ensure_live(&self) -> Result<()> {
        if self.lock().state.is_live() {
            Ok(())
        } else {
            Err(SessionError::Disposed)
        }
    }
}

/// Forwards client events to the session without keeping it alive
struct SessionEventHandler {
    inner: Weak<SessionInner>,
}

impl ClientEventHandler for SessionEventHandler {
    fn handle(&self, event: ClientEvent) {
        match self.inner.upgrade() {
            Some(inner) => inner.apply_event(event),
            None => debug!(?event, "Dropping client event for a released session"),
        }
    }
}

/// Settles an `initialize()` whose future was dropped before the client's
/// `init` returned. The session ends signed out with `SessionError::Cancelled`
/// and `init` is not run again.
struct PendingInit<'a> {
    inner: &'a SessionInner,
    armed: bool,
}

impl Drop for PendingInit<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Session initialization cancelled before the client finished");
            self.inner.settle_init(Err(SessionError::Cancelled));
        }
    }
}

/// Observable authentication session over an external [`AuthClient`].
///
/// Create one per application root and hand out `&AuthSession` to every
/// consumer. Dropping it detaches from the client.
pub struct AuthSession {
    inner: Arc<SessionInner>,
}

impl AuthSession {
    /// Create a session and attach it to `client`'s lifecycle events.
    ///
    /// The session starts `Uninitialized` with a loading snapshot; call
    /// [`initialize`](Self::initialize) to run the client's `init`.
    #[must_use]
    pub fn new(client: Arc<dyn AuthClient>, options: SessionOptions) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(SessionSnapshot::default()));
        let inner = Arc::new(SessionInner {
            client,
            options,
            core: Mutex::new(Core {
                state: SessionState::Uninitialized,
                is_loading: true,
            }),
            snapshot_tx,
            init_in_progress: AtomicBool::new(false),
            init_completed: AtomicBool::new(false),
        });

        inner
            .client
            .set_event_handler(Some(Arc::new(SessionEventHandler {
                inner: Arc::downgrade(&inner),
            })));

        Self { inner }
    }

    /// Run the client's `init` once.
    ///
    /// Calls made while initialization is in flight or after it finished
    /// are no-ops. A failed `init` is terminal for this session: it ends
    /// signed out, the observer sees `on_auth_state_change(false, None)`
    /// followed by one `on_init_error`, and nothing is retried. Dropping
    /// this future before `init` returns counts as a failure with
    /// `SessionError::Cancelled`.
    ///
    /// # Returns
    /// The session state after this call
    pub async fn initialize(&self) -> SessionState {
        let inner = &self.inner;

        if inner.init_completed.load(Ordering::Acquire) {
            debug!("Session already initialized");
            return self.state();
        }
        if inner.init_in_progress.swap(true, Ordering::AcqRel) {
            debug!("Session initialization already in progress");
            return self.state();
        }
        if inner.init_completed.load(Ordering::Acquire) {
            inner.init_in_progress.store(false, Ordering::Release);
            return self.state();
        }

        {
            let mut core = inner.lock();
            if !core.state.is_live() {
                inner.init_in_progress.store(false, Ordering::Release);
                return core.state;
            }
            core.state = SessionState::Initializing;
            inner
                .snapshot_tx
                .send_replace(Arc::new(SessionSnapshot::loading(SessionState::Initializing)));
        }

        info!(options = ?inner.options.init_options, "Initializing auth client");
        let mut pending = PendingInit {
            inner: inner.as_ref(),
            armed: true,
        };
        let outcome = inner.client.init(&inner.options.init_options).await;
        pending.armed = false;

        let state = inner.settle_init(outcome.map_err(|e| {
            warn!(error = %e, "Auth client initialization failed");
            SessionError::init_failed(e.to_string())
        }));
        info!(?state, "Auth session ready");
        state
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        Arc::clone(&self.inner.snapshot_tx.borrow())
    }

    /// Receiver that yields every published snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionSnapshot>> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// The external client
    #[must_use]
    pub fn client(&self) -> &dyn AuthClient {
        self.inner.client.as_ref()
    }

    /// Role lookup of the external client, if it has one
    #[must_use]
    pub fn roles(&self) -> Option<&dyn RoleQuery> {
        self.inner.client.roles()
    }

    /// Whether the signed-in principal holds a realm role
    #[must_use]
    pub fn has_realm_role(&self, role: &str) -> bool {
        self.snapshot().is_authenticated && self.roles().is_some_and(|r| r.has_realm_role(role))
    }

    /// Whether the signed-in principal holds a resource role
    #[must_use]
    pub fn has_resource_role(&self, role: &str, resource: Option<&str>) -> bool {
        self.snapshot().is_authenticated
            && self
                .roles()
                .is_some_and(|r| r.has_resource_role(role, resource))
    }

    /// Start the client's sign-in flow
    ///
    /// # Errors
    /// Returns `SessionError::Disposed` after disposal, or the client's error
    pub async fn sign_in(&self, redirect_uri: Option<&str>) -> Result<()> {
        self.inner.ensure_live()?;
        debug!(?redirect_uri, "Signing in");
        self.inner.client.login(redirect_uri).await
    }

    /// Start the client's sign-out flow
    ///
    /// # Errors
    /// Returns `SessionError::Disposed` after disposal, or the client's error
    pub async fn sign_out(&self, redirect_uri: Option<&str>) -> Result<()> {
        self.inner.ensure_live()?;
        debug!(?redirect_uri, "Signing out");
        self.inner.client.logout(redirect_uri).await
    }

    /// Start the client's registration flow
    ///
    /// # Errors
    /// Returns `SessionError::Disposed` after disposal, or the client's error
    pub async fn sign_up(&self, redirect_uri: Option<&str>) -> Result<()> {
        self.inner.ensure_live()?;
        debug!(?redirect_uri, "Signing up");
        self.inner.client.register(redirect_uri).await
    }

    /// Access token valid for at least [`MIN_TOKEN_VALIDITY`].
    ///
    /// Asks the client to refresh when needed. A failed refresh resolves
    /// to `None`; callers decide whether to sign in again.
    pub async fn get_token(&self) -> Option<String> {
        if self.inner.ensure_live().is_err() {
            return None;
        }
        match self.inner.client.update_token(MIN_TOKEN_VALIDITY).await {
            Ok(refreshed) => {
                let token = self.inner.client.token();
                if refreshed {
                    debug!(
                        token = ?token.as_deref().map(redact_token),
                        "Access token refreshed"
                    );
                }
                token
            }
            Err(e) => {
                warn!(error = %e, "Access token refresh failed");
                None
            }
        }
    }

    /// Trigger that starts sign-in; handed to dynamic fallbacks
    #[must_use]
    pub fn sign_in_trigger(&self, redirect_uri: Option<String>) -> SignInTrigger {
        SignInTrigger {
            inner: Arc::downgrade(&self.inner),
            redirect_uri,
        }
    }

    /// Detach from the client and stop tracking it. Idempotent.
    pub fn dispose(&self) {
        {
            let mut core = self.inner.lock();
            if !core.state.is_live() {
                return;
            }
            core.state = SessionState::Disposed;
        }
        self.inner.client.set_event_handler(None);
        info!("Auth session disposed");
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &self.state())
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

/// Starts sign-in on the session it came from.
///
/// Holds only a weak reference: firing it after the session is gone
/// returns `SessionError::Disposed`.
#[derive(Clone)]
pub struct SignInTrigger {
    inner: Weak<SessionInner>,
    redirect_uri: Option<String>,
}

impl SignInTrigger {
    /// Redirect URI passed to the client's `login`
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    /// Start the sign-in flow
    ///
    /// # Errors
    /// Returns `SessionError::Disposed` when the session is gone, or the
    /// client's error
    pub async fn fire(&self) -> Result<()> {
        let inner = self.inner.upgrade().ok_or(SessionError::Disposed)?;
        inner.ensure_live()?;
        debug!(redirect_uri = ?self.redirect_uri, "Sign-in triggered");
        inner.client.login(self.redirect_uri.as_deref()).await
    }
}

impl std::fmt::Debug for SignInTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInTrigger")
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// Resolve the session a consumer depends on.
///
/// Consumers receive the session explicitly; a missing one is a wiring
/// bug, reported immediately as `SessionError::MissingContext`.
///
/// # Errors
/// Returns `SessionError::MissingContext` naming `consumer` when `session`
/// is `None`
pub fn require<'a>(
    session: Option<&'a AuthSession>,
    consumer: &'static str,
) -> Result<&'a AuthSession> {
    session.ok_or_else(|| SessionError::missing_context(consumer))
}
