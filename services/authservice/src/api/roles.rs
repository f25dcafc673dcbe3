//! Role management endpoints under `/user/roles`.
//!
//! # Purpose
//! CRUD over roles and their permission lists. Reads need `role:read`, writes
//! need `role:write`. Permission lists are deduplicated on write; they are not
//! checked against the permission registry.
use crate::api::error::{ApiError, ApiJson, GatedJson, api_validation_error};
use crate::api::types::{CreateRoleRequest, MessageResponse, UpdateRoleRequest};
use crate::app::AppState;
use crate::auth::permissions::{ROLE_READ, ROLE_WRITE};
use crate::model::Role;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};

#[utoipa::path(
    get,
    path = "/user/roles",
    tag = "roles",
    responses(
        (status = 200, description = "List roles", body = [Role]),
        (status = 403, description = "Missing role:read", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_roles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Role>>, ApiError> {
    let store = state.auth.store();
    state
        .auth
        .gate(ROLE_READ)
        .run(&headers, move |_| async move {
            Ok::<_, ApiError>(Json(store.list_roles().await?))
        })
        .await
}

#[utoipa::path(
    get,
    path = "/user/roles/{name}",
    tag = "roles",
    params(
        ("name" = String, Path, description = "Role name")
    ),
    responses(
        (status = 200, description = "Role record", body = Role),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<Role>, ApiError> {
    let store = state.auth.store();
    state
        .auth
        .gate(ROLE_READ)
        .run(&headers, move |_| async move {
            Ok::<_, ApiError>(Json(store.get_role(&name).await?))
        })
        .await
}

#[utoipa::path(
    post,
    path = "/user/roles",
    tag = "roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = MessageResponse),
        (status = 409, description = "Role already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: GatedJson<CreateRoleRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let store = state.auth.store();
    state
        .auth
        .gate(ROLE_WRITE)
        .run(&headers, move |claims| async move {
            let ApiJson(body) = body?;
            if body.name.trim().is_empty() {
                return Err(api_validation_error("name is required"));
            }
            let role = store
                .create_role(Role::new(body.name, body.permissions))
                .await?;
            tracing::info!(actor = %claims.sub, role = %role.name, "role created");
            Ok((StatusCode::CREATED, Json(MessageResponse::new("Role created"))))
        })
        .await
}

#[utoipa::path(
    put,
    path = "/user/roles/{name}",
    tag = "roles",
    request_body = UpdateRoleRequest,
    params(
        ("name" = String, Path, description = "Role name")
    ),
    responses(
        (status = 200, description = "Role permissions replaced", body = MessageResponse),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse)
    )
)]
/// Replace a role's permission list.
///
/// Credentials already issued keep the permissions they were signed with
/// until they expire.
pub(crate) async fn update_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    body: GatedJson<UpdateRoleRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let store = state.auth.store();
    state
        .auth
        .gate(ROLE_WRITE)
        .run(&headers, move |claims| async move {
            let ApiJson(body) = body?;
            let role = store
                .update_role_permissions(&name, body.permissions)
                .await?;
            tracing::info!(
                actor = %claims.sub,
                role = %role.name,
                permissions = role.permissions.len(),
                "role updated"
            );
            Ok::<_, ApiError>(Json(MessageResponse::new("Role updated")))
        })
        .await
}

#[utoipa::path(
    delete,
    path = "/user/roles/{name}",
    tag = "roles",
    params(
        ("name" = String, Path, description = "Role name")
    ),
    responses(
        (status = 200, description = "Role deleted", body = MessageResponse),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let store = state.auth.store();
    state
        .auth
        .gate(ROLE_WRITE)
        .run(&headers, move |claims| async move {
            store.delete_role(&name).await?;
            tracing::info!(actor = %claims.sub, role = %name, "role deleted");
            Ok::<_, ApiError>(Json(MessageResponse::new("Role deleted")))
        })
        .await
}
