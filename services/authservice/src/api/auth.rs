//! Credential endpoints under `/auth`.
//!
//! # Purpose
//! Login, upstream credential exchange, token validation, the caller's own
//! identity, and the advertised login mode.
//!
//! # Key invariants
//! - Login and exchange failures return the same 401 body regardless of which
//!   factor was wrong.
//! - `/auth/validate` is a pure signature and expiry check; it does not hit
//!   the store. A bad credential is answered with `valid: false`, not 401.
use crate::api::error::{ApiError, ApiJson, GatedJson, api_validation_error};
use crate::api::types::{
    AuthTypeRequest, AuthTypeResponse, ExchangeRequest, LoginRequest, TokenResponse, UserInfo,
    ValidateRequest, ValidateResponse,
};
use crate::app::AppState;
use crate::auth::AuthError;
use crate::auth::permissions::{LAYOUT_READ, LAYOUT_WRITE};
use crate::model::AuthType;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credential issued", body = TokenResponse),
        (status = 401, description = "Authentication failed", body = crate::api::types::ErrorResponse)
    )
)]
/// Exchange a username and password for a signed bearer credential.
pub(crate) async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let issued = state.auth.issue_local(&body.username, &body.password).await?;
    Ok(Json(TokenResponse::bearer(issued.token)))
}

#[utoipa::path(
    post,
    path = "/auth/exchange",
    tag = "auth",
    request_body = ExchangeRequest,
    responses(
        (status = 200, description = "Credential exchanged", body = TokenResponse),
        (status = 401, description = "Upstream credential rejected", body = crate::api::types::ErrorResponse)
    )
)]
/// Exchange an upstream identity-provider token for a local credential.
pub(crate) async fn exchange(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ExchangeRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if body.brick_auth_token.trim().is_empty() {
        return Err(api_validation_error("brickAuthToken is required"));
    }
    let issued = state.auth.exchange(&body.brick_auth_token).await?;
    Ok(Json(TokenResponse::bearer(issued.token)))
}

#[utoipa::path(
    post,
    path = "/auth/validate",
    tag = "auth",
    request_body = ValidateRequest,
    responses(
        (status = 200, description = "Validation outcome; `valid` is false for a bad or expired token", body = ValidateResponse),
        (status = 400, description = "Malformed request body", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Verifier failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn validate(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    match state.auth.validate(&body.token) {
        Ok(claims) => Ok(Json(ValidateResponse::accepted(UserInfo::from(claims)))),
        Err(AuthError::Authentication(reason)) => Ok(Json(ValidateResponse::rejected(reason))),
        Err(err) => Err(err.into()),
    }
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Identity of the bearer", body = UserInfo),
        (status = 401, description = "Missing or invalid credential", body = crate::api::types::ErrorResponse)
    )
)]
/// Return the identity embedded in the caller's bearer credential.
pub(crate) async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserInfo>, ApiError> {
    let claims = state.auth.authenticate(&headers)?;
    Ok(Json(UserInfo::from(claims)))
}

#[utoipa::path(
    get,
    path = "/auth/auth-type",
    tag = "auth",
    responses(
        (status = 200, description = "Current login mode", body = AuthTypeResponse),
        (status = 401, description = "Missing or invalid credential", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Missing x/layout:read", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_auth_type(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthTypeResponse>, ApiError> {
    let current = &state.auth_type;
    state
        .auth
        .gate(LAYOUT_READ)
        .run(&headers, move |_| async move {
            let auth_type = *current.read().await;
            Ok::<_, ApiError>(Json(AuthTypeResponse {
                auth_type,
                message: None,
            }))
        })
        .await
}

#[utoipa::path(
    post,
    path = "/auth/auth-type",
    tag = "auth",
    request_body = AuthTypeRequest,
    responses(
        (status = 200, description = "Login mode updated", body = AuthTypeResponse),
        (status = 400, description = "Unknown login mode", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Missing x/layout:write", body = crate::api::types::ErrorResponse)
    )
)]
/// Change the advertised login mode. Only `local`, `sso` and `both` are
/// accepted.
pub(crate) async fn set_auth_type(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: GatedJson<AuthTypeRequest>,
) -> Result<Json<AuthTypeResponse>, ApiError> {
    let current = &state.auth_type;
    state
        .auth
        .gate(LAYOUT_WRITE)
        .run(&headers, move |claims| async move {
            let ApiJson(body) = body?;
            let auth_type: AuthType = body
                .auth_type
                .parse()
                .map_err(|err: String| api_validation_error(&err))?;
            *current.write().await = auth_type;
            tracing::info!(subject = %claims.sub, auth_type = auth_type.as_str(), "auth type updated");
            Ok::<_, ApiError>(Json(AuthTypeResponse {
                auth_type,
                message: Some("Auth type updated".to_string()),
            }))
        })
        .await
}
