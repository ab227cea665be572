//! Published session state

use serde::Serialize;

use super::user::User;

/// Position of a session in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, client not yet initialized
    Uninitialized,
    /// Client initialization in flight
    Initializing,
    /// A principal is signed in
    Authenticated,
    /// Nobody is signed in (also after a failed initialization)
    Unauthenticated,
    /// Handlers detached; the session no longer tracks the client
    Disposed,
}

impl SessionState {
    /// Whether the session can still change state
    #[must_use]
    pub fn is_live(self) -> bool {
        self != Self::Disposed
    }
}

/// Immutable record of the current authentication state.
///
/// Sessions replace their snapshot wholesale on every transition, so a
/// snapshot read once is always internally consistent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Lifecycle position when this snapshot was published
    pub state: SessionState,
    /// True until client initialization settles
    pub is_loading: bool,
    /// Whether a principal is signed in
    pub is_authenticated: bool,
    /// Projected user, present only when authenticated
    pub user: Option<User>,
    /// Raw ID token, present only when authenticated
    pub id_token: Option<String>,
    /// Raw access token, present only when authenticated
    pub access_token: Option<String>,
}

impl SessionSnapshot {
    /// Snapshot published before initialization settles
    #[must_use]
    pub fn loading(state: SessionState) -> Self {
        Self {
            state,
            is_loading: true,
            is_authenticated: false,
            user: None,
            id_token: None,
            access_token: None,
        }
    }

    /// Snapshot for a settled, signed-out session
    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            state: SessionState::Unauthenticated,
            is_loading: false,
            is_authenticated: false,
            user: None,
            id_token: None,
            access_token: None,
        }
    }

    /// `Authorization` header value for the access token, if any
    #[must_use]
    pub fn authorization_header(&self) -> Option<String> {
        self.access_token
            .as_deref()
            .map(|token| format!("Bearer {token}"))
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::loading(SessionState::Uninitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_loading() {
        let snapshot = SessionSnapshot::default();
        assert_eq!(snapshot.state, SessionState::Uninitialized);
        assert!(snapshot.is_loading);
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.user.is_none());
    }

    #[test]
    fn test_authorization_header() {
        let mut snapshot = SessionSnapshot::signed_out();
        assert!(snapshot.authorization_header().is_none());
        snapshot.access_token = Some("abc".into());
        assert_eq!(snapshot.authorization_header().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(SessionSnapshot::signed_out()).unwrap();
        assert_eq!(json["isLoading"], false);
        assert_eq!(json["isAuthenticated"], false);
        assert_eq!(json["state"], "unauthenticated");
    }
}
