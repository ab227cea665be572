//! Session consumers: conditional visibility and role guards
//!
//! Everything here is a projection of the current [`SessionSnapshot`]
//! plus, for role guards, the client's [`RoleQuery`] capability. Content
//! is generic: pass whatever your UI layer renders.
//!
//! # Example
//!
//! ```no_run
//! use auth_session::guards::{Fallback, Protect, RoleGuard, Visibility};
//! use auth_session::AuthSession;
//!
//! # async fn example(session: &AuthSession) -> auth_session::Result<()> {
//! // Simple predicates
//! let greeting = Visibility::SignedIn.show(&session.snapshot(), "Welcome back", Some("…"));
//!
//! // Admin-only content with a sign-in prompt for visitors
//! let admin = Protect::new()
//!     .role_guard(RoleGuard::builder().resource_roles(vec!["admin".to_string()]).build())
//!     .fallback(Fallback::dynamic(|_trigger| "Sign in to manage users"));
//!
//! let rendered = admin.render(session, "User management").await?;
//! # let _ = (greeting, rendered);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::auth::RoleQuery;
use crate::error::Result;
use crate::session::{AuthSession, SignInTrigger};
use crate::types::SessionSnapshot;

// ============================================================================
// Visibility predicates
// ============================================================================

/// When content should be visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only while signed in
    SignedIn,
    /// Only while signed out
    SignedOut,
    /// Only while the session is still loading
    Loading,
}

impl Visibility {
    /// Whether content is visible for `snapshot`
    #[must_use]
    pub fn matches(self, snapshot: &SessionSnapshot) -> bool {
        match self {
            Self::Loading => snapshot.is_loading,
            Self::SignedIn => !snapshot.is_loading && snapshot.is_authenticated,
            Self::SignedOut => !snapshot.is_loading && !snapshot.is_authenticated,
        }
    }

    /// Pick what to render for `snapshot`.
    ///
    /// While loading, `SignedIn` and `SignedOut` render `loading` instead
    /// of nothing.
    pub fn show<T>(self, snapshot: &SessionSnapshot, content: T, loading: Option<T>) -> Option<T> {
        if snapshot.is_loading && self != Self::Loading {
            return loading;
        }
        self.matches(snapshot).then_some(content)
    }
}

// ============================================================================
// Role guard
// ============================================================================

/// Role requirement: at least one role of every non-empty set.
///
/// OR within a set, AND between the resource and realm sets. With both
/// sets empty any signed-in principal passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, TypedBuilder)]
#[builder(
    builder_method(doc = "Create a new builder for RoleGuard"),
    builder_type(doc = "Builder for RoleGuard", vis = "pub"),
    build_method(doc = "Build the RoleGuard")
)]
pub struct RoleGuard {
    /// Roles on `resource` (or the client's own resource)
    #[builder(default, setter(into))]
    pub resource_roles: Vec<String>,

    /// Realm-level roles
    #[builder(default, setter(into))]
    pub realm_roles: Vec<String>,

    /// Resource to check `resource_roles` against; `None` = own client
    #[builder(default, setter(strip_option, into))]
    pub resource: Option<String>,
}

impl RoleGuard {
    /// Whether `roles` satisfies the requirement.
    ///
    /// A missing role query holds no roles.
    #[must_use]
    pub fn allows(&self, roles: Option<&dyn RoleQuery>) -> bool {
        let resource = self.resource.as_deref();
        let resource_ok = self.resource_roles.is_empty()
            || roles.is_some_and(|q| {
                self.resource_roles
                    .iter()
                    .any(|role| q.has_resource_role(role, resource))
            });
        let realm_ok = self.realm_roles.is_empty()
            || roles.is_some_and(|q| self.realm_roles.iter().any(|role| q.has_realm_role(role)));
        resource_ok && realm_ok
    }

    /// Whether the signed-in principal of `snapshot` passes
    #[must_use]
    pub fn is_visible(&self, snapshot: &SessionSnapshot, roles: Option<&dyn RoleQuery>) -> bool {
        !snapshot.is_loading && snapshot.is_authenticated && self.allows(roles)
    }
}

// ============================================================================
// Fallbacks
// ============================================================================

type RenderFn<T> = Arc<dyn Fn(SignInTrigger) -> T + Send + Sync>;

/// What signed-out visitors see instead of protected content
pub enum Fallback<T> {
    /// Fixed content
    Static(T),
    /// Content rendered with a trigger that starts sign-in
    Dynamic(RenderFn<T>),
}

impl<T> Fallback<T> {
    /// Build a dynamic fallback from a closure
    pub fn dynamic(f: impl Fn(SignInTrigger) -> T + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(f))
    }
}

impl<T: Clone> Clone for Fallback<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(content) => Self::Static(content.clone()),
            Self::Dynamic(f) => Self::Dynamic(Arc::clone(f)),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Fallback<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(content) => f.debug_tuple("Static").field(content).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(<render fn>)"),
        }
    }
}

// ============================================================================
// Protect
// ============================================================================

/// Result of evaluating a [`Protect`] guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Session still loading; render the loading content if any
    Loading(Option<T>),
    /// Access granted
    Show(T),
    /// Signed out; render this fallback
    Fallback(T),
    /// Signed in but missing a required role; render the static fallback if any
    Forbidden(Option<T>),
    /// Signed out with no fallback; sign-in should start automatically
    SignIn,
}

impl<T> Outcome<T> {
    /// Content to render, if any
    pub fn into_content(self) -> Option<T> {
        match self {
            Self::Show(content) | Self::Fallback(content) => Some(content),
            Self::Loading(content) | Self::Forbidden(content) => content,
            Self::SignIn => None,
        }
    }
}

/// Guard for content that requires a signed-in principal.
#[derive(Debug)]
pub struct Protect<T> {
    role_guard: Option<RoleGuard>,
    fallback: Option<Fallback<T>>,
    loading: Option<T>,
    redirect_uri: Option<String>,
}

impl<T> Default for Protect<T> {
    fn default() -> Self {
        Self {
            role_guard: None,
            fallback: None,
            loading: None,
            redirect_uri: None,
        }
    }
}

impl<T: Clone> Protect<T> {
    /// Guard that only requires a signed-in principal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also require roles
    #[must_use]
    pub fn role_guard(mut self, guard: RoleGuard) -> Self {
        self.role_guard = Some(guard);
        self
    }

    /// Content for signed-out visitors
    #[must_use]
    pub fn fallback(mut self, fallback: Fallback<T>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Content while the session loads
    #[must_use]
    pub fn loading(mut self, content: T) -> Self {
        self.loading = Some(content);
        self
    }

    /// Redirect URI used when sign-in starts from this guard
    #[must_use]
    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Decide what to render for the session's current snapshot.
    ///
    /// Signed-out resolution order: static fallback, dynamic fallback
    /// rendered with a sign-in trigger, automatic sign-in.
    pub fn evaluate(&self, session: &AuthSession, content: T) -> Outcome<T> {
        let snapshot = session.snapshot();

        if snapshot.is_loading {
            return Outcome::Loading(self.loading.clone());
        }

        if !snapshot.is_authenticated {
            return match &self.fallback {
                Some(Fallback::Static(fallback)) => Outcome::Fallback(fallback.clone()),
                Some(Fallback::Dynamic(render)) => {
                    Outcome::Fallback(render(session.sign_in_trigger(self.redirect_uri.clone())))
                }
                None => Outcome::SignIn,
            };
        }

        match &self.role_guard {
            Some(guard) if !guard.allows(session.roles()) => {
                debug!(?guard, "Protected content hidden, role missing");
                let fallback = match &self.fallback {
                    Some(Fallback::Static(fallback)) => Some(fallback.clone()),
                    _ => None,
                };
                Outcome::Forbidden(fallback)
            }
            _ => Outcome::Show(content),
        }
    }

    /// Evaluate and carry out automatic sign-in when it is the outcome.
    ///
    /// # Errors
    /// Returns the session's error if automatic sign-in fails to start
    pub async fn render(&self, session: &AuthSession, content: T) -> Result<Option<T>> {
        match self.evaluate(session, content) {
            Outcome::SignIn => {
                debug!("No fallback for signed-out visitor, starting sign-in");
                session.sign_in(self.redirect_uri.as_deref()).await?;
                Ok(None)
            }
            outcome => Ok(outcome.into_content()),
        }
    }
}
