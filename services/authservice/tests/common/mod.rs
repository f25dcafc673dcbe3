#![allow(dead_code)]

use authservice::app::{AppState, build_router};
use authservice::auth::AuthService;
use authservice::auth::external::{DisabledExternalVerifier, ExternalVerifier};
use authservice::auth::password::hash_password;
use authservice::auth::permissions::BUILTIN;
use authservice::auth::service::AuthSettings;
use authservice::model::{AuthType, Role, User};
use authservice::store::RbacStore;
use authservice::store::memory::InMemoryStore;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use brickx_authz::SigningKeyPair;
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN: (&str, &str) = ("admin", "admin-pw");
pub const VIEWER: (&str, &str) = ("viewer", "viewer-pw");

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_external(Arc::new(DisabledExternalVerifier), AuthSettings::default()).await
    }

    /// App with an `admin` user holding every built-in permission and a
    /// `viewer` user holding only `user:read`.
    pub async fn with_external(external: Arc<dyn ExternalVerifier>, settings: AuthSettings) -> Self {
        let store = Arc::new(InMemoryStore::new());
        store
            .set_permissions(BUILTIN.iter().map(|p| p.to_string()).collect())
            .await
            .expect("permissions");
        store
            .create_role(Role::new(
                "admin",
                BUILTIN.iter().map(|p| p.to_string()).collect(),
            ))
            .await
            .expect("admin role");
        store
            .create_role(Role::new("viewer", vec!["user:read".to_string()]))
            .await
            .expect("viewer role");
        for (username, password, role) in [
            (ADMIN.0, ADMIN.1, "admin"),
            (VIEWER.0, VIEWER.1, "viewer"),
        ] {
            store
                .create_user(User {
                    username: username.to_string(),
                    password_hash: hash_password(password).expect("hash"),
                    role: role.to_string(),
                })
                .await
                .expect("user");
        }
        let auth = AuthService::new(
            store.clone(),
            SigningKeyPair::from_seed([42u8; 32]),
            external,
            settings,
        );
        let state = AppState::new(auth, AuthType::Local);
        Self {
            router: build_router(state.clone()),
            state,
            store,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(req).await.expect("response");
        let status = response.status();
        (status, read_json(response).await)
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .send(json_request(
                "POST",
                "/auth/login",
                None,
                serde_json::json!({ "username": username, "password": password }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "login {username}: {body}");
        body["token"].as_str().expect("token").to_string()
    }
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json")
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    raw_json_request(method, uri, token, &body.to_string())
}

/// Like [`json_request`] but with the body sent verbatim, even if it is not JSON.
pub fn raw_json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}
