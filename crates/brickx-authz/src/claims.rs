//! Credential claim shapes.
//!
//! # Purpose
//! Defines the payload embedded in every brickx credential: who the bearer is,
//! which role they held, and the permission snapshot taken at issuance.
//!
//! # Key invariants
//! - `permissions` is frozen when the credential is signed. Verification never
//!   re-reads the RBAC store, so the snapshot may lag live role changes until
//!   the credential expires.
//! - `src` records how the credential was obtained; both variants share the
//!   same claim shape and the same signing key.
use serde::{Deserialize, Serialize};

/// How a credential was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Username/password login against the local user store.
    #[default]
    Local,
    /// Exchange of an upstream credential verified by an external authority.
    Exchanged,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Local => "local",
            CredentialSource::Exchanged => "exchanged",
        }
    }
}

/// Claims carried by brickx-issued JWTs.
///
/// # Examples
/// ```rust
/// use brickx_authz::{Claims, CredentialSource};
///
/// let claims = Claims {
///     iss: "brickx-auth".to_string(),
///     aud: "brickx-services".to_string(),
///     sub: "alice".to_string(),
///     role: "admin".to_string(),
///     permissions: vec!["user:read".to_string()],
///     iat: 1_700_000_000,
///     exp: 1_700_086_400,
///     src: CredentialSource::Local,
/// };
/// assert!(claims.has_permission("user:read"));
/// assert!(!claims.has_permission("user:*"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub src: CredentialSource,
}

impl Claims {
    /// Exact membership test against the permission snapshot.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|granted| granted == permission)
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}
