//! Session and client initialization options

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::callbacks::SharedSessionObserver;

// ============================================================================
// Client Init Options
// ============================================================================

/// What the external client does when it initializes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnLoad {
    /// Restore an existing SSO session silently, stay signed out otherwise
    #[default]
    CheckSso,
    /// Redirect to the sign-in page when no session exists
    LoginRequired,
}

/// PKCE challenge method requested from the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceMethod {
    /// SHA-256 challenge
    #[default]
    S256,
}

/// Options forwarded verbatim to the external client's `init`
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
#[builder(
    builder_method(doc = "Create a new builder for InitOptions"),
    builder_type(doc = "Builder for InitOptions", vis = "pub"),
    build_method(doc = "Build the InitOptions")
)]
pub struct InitOptions {
    /// Behavior on load
    #[builder(default)]
    pub on_load: OnLoad,

    /// PKCE method; `None` disables PKCE
    #[builder(default = Some(PkceMethod::S256))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pkce_method: Option<PkceMethod>,

    /// Whether the client polls a login status iframe
    #[builder(default)]
    pub check_login_iframe: bool,

    /// Page used for silent SSO checks
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silent_check_sso_redirect_uri: Option<String>,

    /// Default redirect URI after login
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Let the client log to its own console
    #[builder(default)]
    pub enable_logging: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

// ============================================================================
// Session Options
// ============================================================================

/// Options for [`AuthSession`](crate::session::AuthSession)
#[derive(Clone, Default, TypedBuilder)]
#[builder(
    builder_method(doc = "Create a new builder for SessionOptions"),
    builder_type(doc = "Builder for SessionOptions", vis = "pub"),
    build_method(doc = "Build the SessionOptions")
)]
pub struct SessionOptions {
    /// Options passed to the client's `init`
    #[builder(default)]
    pub init_options: InitOptions,

    /// Receiver for state change, expiry and init error notifications
    #[builder(default, setter(strip_option))]
    pub observer: Option<SharedSessionObserver>,
}

impl std::fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOptions")
            .field("init_options", &self.init_options)
            .field("observer", &self.observer.as_ref().map(|_| "<observer>"))
            .finish()
    }
}
