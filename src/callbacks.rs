//! Trait-based notification callbacks for session transitions.
//!
//! Implement [`SessionObserver`] on your own type, or build one from
//! closures with [`FnSessionObserver`]. Every method has a no-op default,
//! so observers only override what they care about.
//!
//! # Example: Implementing `SessionObserver`
//!
//! ```
//! use auth_session::callbacks::SessionObserver;
//! use auth_session::types::User;
//!
//! struct AuditLog;
//!
//! impl SessionObserver for AuditLog {
//!     fn on_auth_state_change(&self, is_authenticated: bool, user: Option<&User>) {
//!         println!("authenticated={is_authenticated} user={:?}", user.map(|u| &u.id));
//!     }
//!
//!     fn on_token_expired(&self) {
//!         println!("session expired, sign in again");
//!     }
//! }
//! ```
//!
//! Observers run synchronously on whichever task delivered the event and
//! never while the session's state lock is held.

use std::sync::Arc;

use crate::error::SessionError;
use crate::types::User;

// ============================================================================
// Session Observer Trait
// ============================================================================

/// Receives session notifications.
pub trait SessionObserver: Send + Sync {
    /// Called after every published transition with the new state
    fn on_auth_state_change(&self, is_authenticated: bool, user: Option<&User>) {
        let _ = (is_authenticated, user);
    }

    /// Called once the client reports the token expired.
    ///
    /// The session is already signed out at this point; no refresh is
    /// attempted on your behalf.
    fn on_token_expired(&self) {}

    /// Called once when client initialization fails
    fn on_init_error(&self, error: &SessionError) {
        let _ = error;
    }
}

impl<T: SessionObserver + ?Sized> SessionObserver for Arc<T> {
    fn on_auth_state_change(&self, is_authenticated: bool, user: Option<&User>) {
        (**self).on_auth_state_change(is_authenticated, user);
    }

    fn on_token_expired(&self) {
        (**self).on_token_expired();
    }

    fn on_init_error(&self, error: &SessionError) {
        (**self).on_init_error(error);
    }
}

/// Type alias for a shared session observer.
pub type SharedSessionObserver = Arc<dyn SessionObserver>;

// ============================================================================
// Closure-based observer
// ============================================================================

type StateChangeFn = Box<dyn Fn(bool, Option<&User>) + Send + Sync>;
type ExpiredFn = Box<dyn Fn() + Send + Sync>;
type InitErrorFn = Box<dyn Fn(&SessionError) + Send + Sync>;

/// Observer assembled from optional closures.
///
/// # Example
///
/// ```
/// use auth_session::callbacks::{FnSessionObserver, SharedSessionObserver};
/// use std::sync::Arc;
///
/// let observer: SharedSessionObserver = Arc::new(
///     FnSessionObserver::new()
///         .with_auth_state_change(|signed_in, _user| println!("signed in: {signed_in}"))
///         .with_init_error(|err| eprintln!("auth unavailable: {err}")),
/// );
/// ```
#[derive(Default)]
pub struct FnSessionObserver {
    state_change: Option<StateChangeFn>,
    expired: Option<ExpiredFn>,
    init_error: Option<InitErrorFn>,
}

impl FnSessionObserver {
    /// Create an observer that ignores everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state change handler
    #[must_use]
    pub fn with_auth_state_change(
        mut self,
        f: impl Fn(bool, Option<&User>) + Send + Sync + 'static,
    ) -> Self {
        self.state_change = Some(Box::new(f));
        self
    }

    /// Set the token expiry handler
    #[must_use]
    pub fn with_token_expired(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.expired = Some(Box::new(f));
        self
    }

    /// Set the init error handler
    #[must_use]
    pub fn with_init_error(mut self, f: impl Fn(&SessionError) + Send + Sync + 'static) -> Self {
        self.init_error = Some(Box::new(f));
        self
    }
}

impl SessionObserver for FnSessionObserver {
    fn on_auth_state_change(&self, is_authenticated: bool, user: Option<&User>) {
        if let Some(f) = &self.state_change {
            f(is_authenticated, user);
        }
    }

    fn on_token_expired(&self) {
        if let Some(f) = &self.expired {
            f();
        }
    }

    fn on_init_error(&self, error: &SessionError) {
        if let Some(f) = &self.init_error {
            f(error);
        }
    }
}
