//! Client configuration loading
//!
//! Reads the adapter JSON most OIDC servers hand out for browser clients:
//!
//! ```json
//! { "realm": "acme", "auth-server-url": "https://id.example.com/", "resource": "web" }
//! ```
//!
//! The short form `{ "url", "realm", "clientId" }` is accepted as well.
//! Configuration can come from a string, a file, or an HTTP endpoint; the
//! HTTP fetch can be aborted with a [`CancellationToken`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Result, SessionError};

/// Where the external client finds its identity server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the identity server
    #[serde(alias = "auth-server-url")]
    pub url: String,
    /// Realm (tenant) name
    pub realm: String,
    /// Public client ID of this application
    #[serde(alias = "resource")]
    pub client_id: String,
}

impl ClientConfig {
    /// Create a configuration, validating that no field is blank
    ///
    /// # Errors
    /// Returns `SessionError::InvalidConfig` naming the first blank field
    pub fn new(
        url: impl Into<String>,
        realm: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            url: url.into(),
            realm: realm.into(),
            client_id: client_id.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    ///
    /// # Errors
    /// Returns `SessionError::JsonDecode` for malformed JSON and
    /// `SessionError::InvalidConfig` for blank fields
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON document from disk
    ///
    /// # Errors
    /// Returns `SessionError::Io` if the file cannot be read, or the
    /// errors of [`from_json_str`](Self::from_json_str)
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading client config");
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&content)
    }

    /// Fetch a JSON document over HTTP
    ///
    /// # Errors
    /// Returns `SessionError::Cancelled` when `cancel` fires first,
    /// `SessionError::Http` on transport or status errors, or the errors of
    /// [`from_json_str`](Self::from_json_str)
    pub async fn fetch(url: &str, cancel: &CancellationToken) -> Result<Self> {
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        info!(url, "Fetching client config");
        let request = async {
            let response = reqwest::get(url).await?.error_for_status()?;
            let body = response.text().await?;
            Ok::<_, SessionError>(body)
        };

        let body = tokio::select! {
            () = cancel.cancelled() => {
                debug!(url, "Client config fetch cancelled");
                return Err(SessionError::Cancelled);
            }
            body = request => body?,
        };
        Self::from_json_str(&body)
    }

    /// Issuer URL: `{url}/realms/{realm}`
    #[must_use]
    pub fn issuer(&self) -> String {
        format!("{}/realms/{}", self.url.trim_end_matches('/'), self.realm)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("url", &self.url),
            ("realm", &self.realm),
            ("clientId", &self.client_id),
        ] {
            if value.trim().is_empty() {
                return Err(SessionError::invalid_config(format!(
                    "{field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}
