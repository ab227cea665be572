//! Role lookup capability

use serde_json::Value;

use super::claims::Claims;

/// Role queries answered by the external auth client.
///
/// Clients without role support return `None` from
/// [`AuthClient::roles`](crate::client::AuthClient::roles); consumers treat
/// that as "role not held".
pub trait RoleQuery: Send + Sync {
    /// Whether the principal holds `role` at realm level
    fn has_realm_role(&self, role: &str) -> bool;

    /// Whether the principal holds `role` on `resource`.
    ///
    /// `None` means the client's own resource (its client id).
    fn has_resource_role(&self, role: &str, resource: Option<&str>) -> bool;
}

/// Role lookup backed by `realm_access` / `resource_access` token claims.
///
/// Reads the same claim layout Keycloak-style servers issue:
///
/// ```json
/// {
///   "realm_access": { "roles": ["user"] },
///   "resource_access": { "my-app": { "roles": ["admin"] } }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ClaimRoles {
    claims: Claims,
    default_resource: String,
}

impl ClaimRoles {
    /// Create a role lookup for `claims`, resolving resource-less queries
    /// against `default_resource`
    pub fn new(claims: Claims, default_resource: impl Into<String>) -> Self {
        Self {
            claims,
            default_resource: default_resource.into(),
        }
    }

    fn roles_at<'a>(value: Option<&'a Value>) -> impl Iterator<Item = &'a str> {
        value
            .and_then(|access| access.get("roles"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }
}

impl RoleQuery for ClaimRoles {
    fn has_realm_role(&self, role: &str) -> bool {
        Self::roles_at(self.claims.get("realm_access")).any(|r| r == role)
    }

    fn has_resource_role(&self, role: &str, resource: Option<&str>) -> bool {
        let resource = resource.unwrap_or(&self.default_resource);
        let access = self
            .claims
            .get("resource_access")
            .and_then(|all| all.get(resource));
        Self::roles_at(access).any(|r| r == role)
    }
}
