//! User management endpoints under `/user/users`.
//!
//! # Purpose
//! CRUD over local user accounts. Reads need `user:read`, writes need
//! `user:write`. Passwords are hashed before they reach the store and hashes
//! never appear in responses.
use crate::api::error::{ApiError, ApiJson, GatedJson, api_validation_error};
use crate::api::types::{CreateUserRequest, MessageResponse, UpdateUserRequest, UserView};
use crate::app::AppState;
use crate::auth::permissions::{USER_READ, USER_WRITE};
use crate::model::{User, UserPatch};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};

#[utoipa::path(
    get,
    path = "/user/users",
    tag = "users",
    responses(
        (status = 200, description = "List users", body = [UserView]),
        (status = 403, description = "Missing user:read", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let store = state.auth.store();
    state
        .auth
        .gate(USER_READ)
        .run(&headers, move |_| async move {
            let users = store.list_users().await?;
            Ok::<_, ApiError>(Json(users.into_iter().map(UserView::from).collect()))
        })
        .await
}

#[utoipa::path(
    get,
    path = "/user/users/{username}",
    tag = "users",
    params(
        ("username" = String, Path, description = "Username")
    ),
    responses(
        (status = 200, description = "User record", body = UserView),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<Json<UserView>, ApiError> {
    let store = state.auth.store();
    state
        .auth
        .gate(USER_READ)
        .run(&headers, move |_| async move {
            let user = store.get_user(&username).await?;
            Ok::<_, ApiError>(Json(UserView::from(user)))
        })
        .await
}

#[utoipa::path(
    post,
    path = "/user/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Missing field", body = crate::api::types::ErrorResponse),
        (status = 409, description = "User already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: GatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let auth = &state.auth;
    auth.gate(USER_WRITE)
        .run(&headers, move |claims| async move {
            let ApiJson(body) = body?;
            if body.username.trim().is_empty() {
                return Err(api_validation_error("username is required"));
            }
            if body.password.is_empty() {
                return Err(api_validation_error("password is required"));
            }
            if body.role.trim().is_empty() {
                return Err(api_validation_error("role is required"));
            }
            let password_hash = auth.hash_password(&body.password).await?;
            let user = auth
                .store()
                .create_user(User {
                    username: body.username,
                    password_hash,
                    role: body.role,
                })
                .await?;
            tracing::info!(actor = %claims.sub, username = %user.username, "user created");
            Ok((StatusCode::CREATED, Json(MessageResponse::new("User created"))))
        })
        .await
}

#[utoipa::path(
    put,
    path = "/user/users/{username}",
    tag = "users",
    request_body = UpdateUserRequest,
    params(
        ("username" = String, Path, description = "Username")
    ),
    responses(
        (status = 200, description = "User updated", body = MessageResponse),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    )
)]
/// Update a user's password and/or role. Absent fields stay unchanged.
pub(crate) async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
    body: GatedJson<UpdateUserRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let auth = &state.auth;
    auth.gate(USER_WRITE)
        .run(&headers, move |claims| async move {
            let ApiJson(body) = body?;
            if body.role.as_deref().is_some_and(|role| role.trim().is_empty()) {
                return Err(api_validation_error("role must not be empty"));
            }
            let password_hash = match body.password.as_deref() {
                Some("") => return Err(api_validation_error("password must not be empty")),
                Some(password) => Some(auth.hash_password(password).await?),
                None => None,
            };
            let patch = UserPatch {
                password_hash,
                role: body.role,
            };
            auth.store().update_user(&username, patch).await?;
            tracing::info!(actor = %claims.sub, username = %username, "user updated");
            Ok(Json(MessageResponse::new("User updated")))
        })
        .await
}

#[utoipa::path(
    delete,
    path = "/user/users/{username}",
    tag = "users",
    params(
        ("username" = String, Path, description = "Username")
    ),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let store = state.auth.store();
    state
        .auth
        .gate(USER_WRITE)
        .run(&headers, move |claims| async move {
            store.delete_user(&username).await?;
            tracing::info!(actor = %claims.sub, username = %username, "user deleted");
            Ok::<_, ApiError>(Json(MessageResponse::new("User deleted")))
        })
        .await
}
