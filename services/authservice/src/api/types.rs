//! HTTP API request/response types.
//!
//! # Purpose
//! Defines the wire shapes of the auth REST API and feeds OpenAPI schema
//! generation. Field names follow the existing client contract, so a few
//! keys are camelCase (`brickAuthToken`, `userInfo`, `authType`) while the
//! rest are snake_case.
use crate::model::{AuthType, User};
use brickx_authz::Claims;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const BEARER_TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub storage: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ExchangeRequest {
    #[serde(rename = "brickAuthToken")]
    pub brick_auth_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct TokenResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(token: String) -> Self {
        Self {
            token,
            token_type: BEARER_TOKEN_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ValidateRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
}

impl From<Claims> for UserInfo {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            role: claims.role,
            permissions: claims.permissions,
        }
    }
}

/// Outcome of `/auth/validate`. A rejected credential is a normal answer,
/// not an HTTP error: `valid` is false and `error` says why.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(rename = "userInfo", default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidateResponse {
    pub fn accepted(user_info: UserInfo) -> Self {
        Self {
            valid: true,
            user_info: Some(user_info),
            error: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            user_info: None,
            error: Some(reason.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AuthTypeRequest {
    #[serde(rename = "authType", alias = "auth_type")]
    pub auth_type: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AuthTypeResponse {
    #[serde(rename = "authType")]
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Public view of a user record. The password hash never leaves the service.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct UserView {
    pub username: String,
    pub role: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UpdateRoleRequest {
    pub permissions: Vec<String>,
}
