//! Token claims and role lookup
//!
//! Helpers for reading what the external OAuth/OIDC client already holds.
//! Nothing here talks to the network or verifies signatures.
//!
//! # Example
//!
//! ```
//! use auth_session::auth::{ClaimRoles, RoleQuery, extract_claims};
//!
//! // {"sub":"u1","realm_access":{"roles":["admin"]}}
//! let token = "e30.eyJzdWIiOiJ1MSIsInJlYWxtX2FjY2VzcyI6eyJyb2xlcyI6WyJhZG1pbiJdfX0.sig";
//! let claims = extract_claims(token).unwrap();
//!
//! let roles = ClaimRoles::new(claims, "my-app");
//! assert!(roles.has_realm_role("admin"));
//! ```
//!
//! # Security
//!
//! - Claims are decoded, not verified. Never authorize on them client-side.
//! - Role lookups mirror what the token says; the server remains the
//!   authority.

mod claims;
mod roles;

pub use claims::{Claims, expires_at, extract_claims, remaining_validity};
pub use roles::{ClaimRoles, RoleQuery};
