//! RBAC records persisted by the store.
//!
//! # Key invariants
//! - `User::password_hash` is always a PHC hash string, never a plaintext
//!   password. It never leaves the service through the HTTP API.
//! - `Role::permissions` holds no duplicates; constructors normalize input.
use brickx_authz::normalize_permissions;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

/// Partial user update. `None` leaves the stored field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub password_hash: Option<String>,
    pub role: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none() && self.role.is_none()
    }

    pub fn apply(self, user: &mut User) {
        if let Some(hash) = self.password_hash {
            user.password_hash = hash;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub name: String,
    pub permissions: Vec<String>,
}

impl Role {
    pub fn new(name: impl Into<String>, permissions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            permissions: normalize_permissions(permissions),
        }
    }
}

/// Login mode advertised to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    Local,
    Sso,
    Both,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Local => "local",
            AuthType::Sso => "sso",
            AuthType::Both => "both",
        }
    }
}

impl std::str::FromStr for AuthType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(AuthType::Local),
            "sso" => Ok(AuthType::Sso),
            "both" => Ok(AuthType::Both),
            other => Err(format!("invalid auth type: {other}")),
        }
    }
}
