//! Permission registry endpoints under `/user/permissions`.
//!
//! # Purpose
//! Lists and wholesale replaces the set of known permission strings.
//! `set` is a full replacement: after it succeeds the registry equals the
//! submitted list (deduplicated), nothing more.
use crate::api::error::{ApiError, ApiJson, GatedJson};
use crate::api::types::MessageResponse;
use crate::app::AppState;
use crate::auth::permissions::{PERMISSION_READ, PERMISSION_WRITE};
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

#[utoipa::path(
    get,
    path = "/user/permissions",
    tag = "permissions",
    responses(
        (status = 200, description = "Registered permission strings", body = [String]),
        (status = 403, description = "Missing permission:read", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, ApiError> {
    let store = state.auth.store();
    state
        .auth
        .gate(PERMISSION_READ)
        .run(&headers, move |_| async move {
            Ok::<_, ApiError>(Json(store.list_permissions().await?))
        })
        .await
}

#[utoipa::path(
    post,
    path = "/user/permissions",
    tag = "permissions",
    request_body(content = Vec<String>, description = "Complete permission list as a bare JSON array"),
    responses(
        (status = 200, description = "Registry replaced", body = MessageResponse),
        (status = 403, description = "Missing permission:write", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn set_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: GatedJson<Vec<String>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let store = state.auth.store();
    state
        .auth
        .gate(PERMISSION_WRITE)
        .run(&headers, move |claims| async move {
            let ApiJson(permissions) = body?;
            let stored = store.set_permissions(permissions).await?;
            tracing::info!(actor = %claims.sub, count = stored.len(), "permissions replaced");
            Ok::<_, ApiError>(Json(MessageResponse::new("Permissions updated")))
        })
        .await
}
