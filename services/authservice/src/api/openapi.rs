//! OpenAPI schema aggregation for the auth API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document served
//! at `/openapi.json` and rendered at `/docs`.
use crate::api::{
    auth, permissions, roles, system,
    types::{
        AuthTypeRequest, AuthTypeResponse, CreateRoleRequest, CreateUserRequest, ErrorResponse,
        ExchangeRequest, HealthStatus, LoginRequest, MessageResponse, TokenResponse,
        UpdateRoleRequest, UpdateUserRequest, UserInfo, UserView, ValidateRequest,
        ValidateResponse,
    },
    users,
};
use crate::model::{AuthType, Role};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "brickx-authservice",
        version = "v1",
        description = "Authentication and RBAC HTTP API"
    ),
    paths(
        system::health,
        auth::login,
        auth::exchange,
        auth::validate,
        auth::me,
        auth::get_auth_type,
        auth::set_auth_type,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        roles::list_roles,
        roles::get_role,
        roles::create_role,
        roles::update_role,
        roles::delete_role,
        permissions::list_permissions,
        permissions::set_permissions,
    ),
    components(schemas(
        AuthType,
        AuthTypeRequest,
        AuthTypeResponse,
        CreateRoleRequest,
        CreateUserRequest,
        ErrorResponse,
        ExchangeRequest,
        HealthStatus,
        LoginRequest,
        MessageResponse,
        Role,
        TokenResponse,
        UpdateRoleRequest,
        UpdateUserRequest,
        UserInfo,
        UserView,
        ValidateRequest,
        ValidateResponse,
    )),
    tags(
        (name = "system", description = "Health"),
        (name = "auth", description = "Credential issuance and validation"),
        (name = "users", description = "Local user accounts"),
        (name = "roles", description = "Roles and their permissions"),
        (name = "permissions", description = "Permission registry")
    )
)]
pub struct ApiDoc;
