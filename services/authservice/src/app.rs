//! Auth service HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::auth::AuthService;
use crate::model::AuthType;
use axum::Router;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    /// Login mode advertised to clients. Process-local; resets on restart.
    pub auth_type: Arc<RwLock<AuthType>>,
}

impl AppState {
    pub fn new(auth: AuthService, auth_type: AuthType) -> Self {
        Self {
            auth,
            auth_type: Arc::new(RwLock::new(auth_type)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    Router::new()
        .route("/health", axum::routing::get(api::system::health))
        .route("/auth/login", axum::routing::post(api::auth::login))
        .route("/auth/exchange", axum::routing::post(api::auth::exchange))
        .route("/auth/validate", axum::routing::post(api::auth::validate))
        .route("/auth/me", axum::routing::get(api::auth::me))
        .route(
            "/auth/auth-type",
            axum::routing::get(api::auth::get_auth_type).post(api::auth::set_auth_type),
        )
        .route(
            "/user/users",
            axum::routing::get(api::users::list_users).post(api::users::create_user),
        )
        .route(
            "/user/users/{username}",
            axum::routing::get(api::users::get_user)
                .put(api::users::update_user)
                .delete(api::users::delete_user),
        )
        .route(
            "/user/roles",
            axum::routing::get(api::roles::list_roles).post(api::roles::create_role),
        )
        .route(
            "/user/roles/{name}",
            axum::routing::get(api::roles::get_role)
                .put(api::roles::update_role)
                .delete(api::roles::delete_role),
        )
        .route(
            "/user/permissions",
            axum::routing::get(api::permissions::list_permissions)
                .post(api::permissions::set_permissions),
        )
        .merge(utoipa_swagger_ui::SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(trace_layer)
        .with_state(state)
}
