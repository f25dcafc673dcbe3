//! Credential lifecycle and permission enforcement.
//!
//! # Purpose
//! [`AuthService`] issues credentials for local logins, exchanges upstream
//! credentials for local ones, validates bearer credentials, and gates
//! operations on exact permission strings.
//!
//! # Key invariants
//! - Authentication failures never reveal which factor was wrong.
//! - Validation is a pure signature and expiry check; it never touches the
//!   store.
//! - [`AuthError::Authentication`] (401) and [`AuthError::Authorization`] (403)
//!   stay distinct all the way to the HTTP boundary.
use crate::store::StoreError;
use thiserror::Error;

pub mod external;
pub mod gate;
pub mod idp;
pub mod oidc;
pub mod password;
pub mod service;

pub use gate::{PermissionGate, extract_bearer};
pub use service::AuthService;

/// Built-in permission strings guarding the service's own API.
pub mod permissions {
    pub const USER_READ: &str = "user:read";
    pub const USER_WRITE: &str = "user:write";
    pub const ROLE_READ: &str = "role:read";
    pub const ROLE_WRITE: &str = "role:write";
    pub const PERMISSION_READ: &str = "permission:read";
    pub const PERMISSION_WRITE: &str = "permission:write";
    pub const LAYOUT_READ: &str = "x/layout:read";
    pub const LAYOUT_WRITE: &str = "x/layout:write";

    pub const BUILTIN: [&str; 8] = [
        USER_READ,
        USER_WRITE,
        ROLE_READ,
        ROLE_WRITE,
        PERMISSION_READ,
        PERMISSION_WRITE,
        LAYOUT_READ,
        LAYOUT_WRITE,
    ];
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad credentials or an invalid, expired or malformed token. The message
    /// is safe to return to clients.
    #[error("{0}")]
    Authentication(String),
    #[error("missing permission {permission}")]
    Authorization { permission: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn authentication_failed() -> Self {
        AuthError::Authentication("authentication failed".to_string())
    }
}
