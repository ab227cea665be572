//! Type definitions for auth sessions
//!
//! Identifiers, the user record and its projection from token claims, the
//! published session snapshot, and option builders.

// Module declarations
pub mod identifiers;
pub mod options;
pub mod snapshot;
pub mod user;

pub use identifiers::UserId;
pub use options::{
    InitOptions, InitOptionsBuilder, OnLoad, PkceMethod, SessionOptions, SessionOptionsBuilder,
};
pub use snapshot::{SessionSnapshot, SessionState};
pub use user::{USER_PRECEDENCE, User, UserFields, UserSource, resolve_user};
