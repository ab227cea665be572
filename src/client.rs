//! Boundary to the external OAuth/OIDC client
//!
//! The session never performs OAuth itself. It drives an [`AuthClient`]
//! (typically a binding to a Keycloak-style client) and listens to the
//! lifecycle events that client raises.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   init / login / logout     ┌──────────────────┐
//! │     AuthSession      │ ──────────────────────────→ │    AuthClient    │
//! │                      │   register / update_token   │ (external OIDC)  │
//! │  snapshot (watch) ◄──┤                             │                  │
//! │                      │ ←────────────────────────── │  event handler   │
//! └──────────────────────┘   AuthSuccess / AuthLogout  └──────────────────┘
//!                            TokenExpired
//! ```
//!
//! The session registers exactly one [`ClientEventHandler`] with
//! [`AuthClient::set_event_handler`] and clears it again on disposal.
//!
//! # Example: Implementing `AuthClient`
//!
//! ```no_run
//! use auth_session::client::{AuthClient, SharedEventHandler};
//! use auth_session::types::InitOptions;
//! use auth_session::Result;
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! struct AnonymousClient;
//!
//! #[async_trait]
//! impl AuthClient for AnonymousClient {
//!     async fn init(&self, _options: &InitOptions) -> Result<bool> {
//!         Ok(false)
//!     }
//!     async fn login(&self, _redirect_uri: Option<&str>) -> Result<()> {
//!         Ok(())
//!     }
//!     async fn logout(&self, _redirect_uri: Option<&str>) -> Result<()> {
//!         Ok(())
//!     }
//!     async fn register(&self, _redirect_uri: Option<&str>) -> Result<()> {
//!         Ok(())
//!     }
//!     async fn update_token(&self, _min_validity: Duration) -> Result<bool> {
//!         Ok(false)
//!     }
//!     fn token(&self) -> Option<String> {
//!         None
//!     }
//!     fn id_token(&self) -> Option<String> {
//!         None
//!     }
//!     fn set_event_handler(&self, _handler: Option<SharedEventHandler>) {}
//! }
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Claims, RoleQuery, extract_claims};
use crate::error::Result;
use crate::types::InitOptions;

/// Lifecycle events raised by the external client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientEvent {
    /// A principal signed in (`onAuthSuccess`)
    AuthSuccess,
    /// The principal signed out (`onAuthLogout`)
    AuthLogout,
    /// The access token expired (`onTokenExpired`)
    TokenExpired,
}

/// Receiver for [`ClientEvent`]s
pub trait ClientEventHandler: Send + Sync {
    /// Handle one event. Called on the client's event task.
    fn handle(&self, event: ClientEvent);
}

/// Type alias for a shared event handler.
pub type SharedEventHandler = Arc<dyn ClientEventHandler>;

/// Operations the session needs from the external OAuth/OIDC client.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Initialize the client
    ///
    /// # Returns
    /// Whether a principal is authenticated once initialization settles
    ///
    /// # Errors
    /// Returns error if the client cannot initialize
    async fn init(&self, options: &InitOptions) -> Result<bool>;

    /// Start the sign-in flow
    ///
    /// # Errors
    /// Returns error if the flow cannot start
    async fn login(&self, redirect_uri: Option<&str>) -> Result<()>;

    /// Start the sign-out flow
    ///
    /// # Errors
    /// Returns error if the flow cannot start
    async fn logout(&self, redirect_uri: Option<&str>) -> Result<()>;

    /// Start the registration flow
    ///
    /// # Errors
    /// Returns error if the flow cannot start
    async fn register(&self, redirect_uri: Option<&str>) -> Result<()>;

    /// Ensure the access token stays valid for at least `min_validity`
    ///
    /// # Returns
    /// Whether the token was refreshed
    ///
    /// # Errors
    /// Returns error if a needed refresh failed
    async fn update_token(&self, min_validity: Duration) -> Result<bool>;

    /// Current raw access token
    fn token(&self) -> Option<String>;

    /// Current raw ID token
    fn id_token(&self) -> Option<String>;

    /// Claims of the current access token.
    ///
    /// Defaults to decoding [`token`](Self::token); clients that already
    /// hold parsed claims should return those.
    fn token_parsed(&self) -> Option<Claims> {
        self.token().as_deref().and_then(extract_claims)
    }

    /// Role lookup, if the client supports it
    fn roles(&self) -> Option<&dyn RoleQuery> {
        None
    }

    /// Install (`Some`) or remove (`None`) the lifecycle event handler
    fn set_event_handler(&self, handler: Option<SharedEventHandler>);
}
