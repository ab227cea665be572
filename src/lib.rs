//! # auth-session
//!
//! Observable authentication session state on top of an external
//! OAuth/OIDC client. The crate does not implement OAuth: it drives a
//! client you plug in through [`AuthClient`] and turns its lifecycle
//! callbacks into one consistent, shareable [`SessionSnapshot`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use auth_session::{AuthClient, AuthSession, SessionOptions};
//! use auth_session::callbacks::FnSessionObserver;
//! use std::sync::Arc;
//!
//! # async fn example(client: Arc<dyn AuthClient>) -> auth_session::Result<()> {
//! let options = SessionOptions::builder()
//!     .observer(Arc::new(
//!         FnSessionObserver::new()
//!             .with_auth_state_change(|signed_in, user| {
//!                 println!("signed in: {signed_in}, user: {:?}", user.map(|u| u.display_name()));
//!             })
//!             .with_token_expired(|| println!("session expired")),
//!     ))
//!     .build();
//!
//! let session = AuthSession::new(client, options);
//! session.initialize().await;
//!
//! let snapshot = session.snapshot();
//! if snapshot.is_authenticated {
//!     let token = session.get_token().await;
//! #   let _ = token;
//! } else {
//!     session.sign_in(None).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Features
//!
//! ### 1. Session synchronization with [`AuthSession`]
//!
//! - One `init` per session, however often `initialize()` is called
//! - Snapshots replaced wholesale and published through a `watch` channel
//! - Token expiry signs the session out; refresh is never attempted silently
//! - `get_token()` asks the client for 30 seconds of validity and resolves to
//!   `None` when that fails
//!
//! ### 2. Claims and users
//!
//! [`auth::extract_claims`] decodes a token payload without verifying it,
//! [`User::from_claims`] projects standard OIDC claims, and
//! [`types::resolve_user`] merges explicit overrides, token claims and the
//! session's user in that order.
//!
//! ### 3. Guards
//!
//! [`guards::Visibility`], [`guards::RoleGuard`] and [`guards::Protect`]
//! decide what to render for a snapshot.
//!
//! ### 4. Configuration
//!
//! [`config::ClientConfig`] loads client settings from JSON, a file, or an
//! HTTP endpoint with cancellation.
//!
//! ## Architecture
//!
//! - [`auth`]: Token claims decoding and role lookup
//! - [`client`]: The [`AuthClient`] boundary to the external OIDC client
//! - [`session`]: The session synchronizer
//! - [`callbacks`]: Observer notifications
//! - [`guards`]: Conditional rendering helpers
//! - [`config`]: Client configuration loading
//! - [`types`]: Snapshot, user, identifier and option types
//! - [`error`]: Error types and handling
//!
//! ## Logging
//!
//! This crate uses [`tracing`](https://crates.io/crates/tracing) for structured logging.
//! Tokens are never logged in full. To see logs, attach a subscriber:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result<T, SessionError>`](Result). Malformed
//! tokens are not errors: decoding returns `None`.
//!
//! ## Security
//!
//! - **Claims are untrusted** - decoded without signature verification; the
//!   server remains the authority for authorization
//! - **No silent refresh on expiry** - an expired session ends signed out
//! - **Redacted logs** - tokens appear in logs only as a short prefix

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod callbacks;
pub mod client;
pub mod config;
pub mod error;
pub mod guards;
pub mod session;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use callbacks::{FnSessionObserver, SessionObserver, SharedSessionObserver};
pub use client::{AuthClient, ClientEvent, ClientEventHandler, SharedEventHandler};
pub use config::ClientConfig;
pub use error::{Result, SessionError};
pub use guards::{Fallback, Outcome, Protect, RoleGuard, Visibility};
pub use session::{AuthSession, MIN_TOKEN_VALIDITY, SignInTrigger};
pub use types::{
    InitOptions, OnLoad, SessionOptions, SessionSnapshot, SessionState, User, UserFields, UserId,
};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
