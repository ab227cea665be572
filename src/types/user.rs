//! User record and projection from token claims

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::identifiers::UserId;
use crate::auth::{Claims, extract_claims};

/// Authenticated user as seen through the current token.
///
/// Built fresh from claims on every authentication event and never
/// updated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Subject identifier (`sub`); empty when the token carries none
    pub id: UserId,
    /// Email address (`email`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether the email is verified (`email_verified`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    /// Full name (`name`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Given name (`given_name`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name (`family_name`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Preferred username (`preferred_username`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Avatar URL (`picture`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Every claim of the token, verbatim
    #[serde(default)]
    pub claims: Claims,
}

impl User {
    /// Project token claims onto a user record
    #[must_use]
    pub fn from_claims(claims: &Claims) -> Self {
        let fields = UserFields::from_claims(claims);
        Self {
            id: fields.id.unwrap_or_default(),
            email: fields.email,
            email_verified: fields.email_verified,
            name: fields.name,
            first_name: fields.first_name,
            last_name: fields.last_name,
            username: fields.username,
            image_url: fields.image_url,
            claims: claims.clone(),
        }
    }

    /// Human readable name; empty string when the token carries none
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !joined.is_empty() {
            return joined;
        }
        self.username.clone().unwrap_or_default()
    }

    /// Up to two uppercase initials for avatar placeholders
    #[must_use]
    pub fn initials(&self) -> String {
        let source = match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                format!("{first} {last}")
            }
            _ => self.display_name(),
        };
        let source = if source.is_empty() {
            self.email.clone().unwrap_or_default()
        } else {
            source
        };

        source
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// Optional view over the user fields, used for override resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFields {
    /// Subject identifier
    pub id: Option<UserId>,
    /// Email address
    pub email: Option<String>,
    /// Email verification flag
    pub email_verified: Option<bool>,
    /// Full name
    pub name: Option<String>,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Preferred username
    pub username: Option<String>,
    /// Avatar URL
    pub image_url: Option<String>,
}

impl UserFields {
    /// Read the mapped claims (`sub`, `email`, `given_name`, ...)
    #[must_use]
    pub fn from_claims(claims: &Claims) -> Self {
        let text = |key: &str| claims.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            id: text("sub").map(UserId::from),
            email: text("email"),
            email_verified: claims.get("email_verified").and_then(Value::as_bool),
            name: text("name"),
            first_name: text("given_name"),
            last_name: text("family_name"),
            username: text("preferred_username"),
            image_url: text("picture"),
        }
    }

    /// Fields of an existing user
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            id: Some(user.id.clone()).filter(|id| !id.is_empty()),
            email: user.email.clone(),
            email_verified: user.email_verified,
            name: user.name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            image_url: user.image_url.clone(),
        }
    }

    /// Whether no field is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill every unset field from `lower`
    #[must_use]
    pub fn or(self, lower: Self) -> Self {
        Self {
            id: self.id.or(lower.id),
            email: self.email.or(lower.email),
            email_verified: self.email_verified.or(lower.email_verified),
            name: self.name.or(lower.name),
            first_name: self.first_name.or(lower.first_name),
            last_name: self.last_name.or(lower.last_name),
            username: self.username.or(lower.username),
            image_url: self.image_url.or(lower.image_url),
        }
    }
}

/// Where a user field may come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSource {
    /// Caller-supplied override
    Explicit,
    /// Claims of a caller-supplied token
    Token,
    /// The user published by the session
    Context,
}

/// Fixed precedence for [`resolve_user`], highest first
pub const USER_PRECEDENCE: [UserSource; 3] =
    [UserSource::Explicit, UserSource::Token, UserSource::Context];

/// Resolve a user from three optional sources.
///
/// Each field is taken from the first source in [`USER_PRECEDENCE`] that
/// provides it. Returns `None` when no source contributes anything.
///
/// # Example
/// ```
/// use auth_session::types::{User, UserFields, resolve_user};
///
/// let context = User { name: Some("Context".into()), ..Default::default() };
/// let explicit = UserFields { name: Some("Override".into()), ..Default::default() };
///
/// let user = resolve_user(Some(&explicit), None, Some(&context)).unwrap();
/// assert_eq!(user.display_name(), "Override");
/// ```
#[must_use]
pub fn resolve_user(
    explicit: Option<&UserFields>,
    token: Option<&str>,
    context: Option<&User>,
) -> Option<User> {
    let token_claims = token.and_then(extract_claims);

    let mut fields = UserFields::default();
    for source in USER_PRECEDENCE {
        let layer = match source {
            UserSource::Explicit => explicit.cloned(),
            UserSource::Token => token_claims.as_ref().map(UserFields::from_claims),
            UserSource::Context => context.map(UserFields::from_user),
        };
        if let Some(layer) = layer {
            fields = fields.or(layer);
        }
    }

    let claims = token_claims
        .or_else(|| context.map(|user| user.claims.clone()))
        .unwrap_or_default();

    if fields.is_empty() && claims.is_empty() {
        return None;
    }

    Some(User {
        id: fields.id.unwrap_or_default(),
        email: fields.email,
        email_verified: fields.email_verified,
        name: fields.name,
        first_name: fields.first_name,
        last_name: fields.last_name,
        username: fields.username,
        image_url: fields.image_url,
        claims,
    })
}
