//! Permission gate for protected operations.
//!
//! # Purpose
//! [`PermissionGate`] wraps an operation so it only runs for a bearer whose
//! valid credential lists the required permission string verbatim.
//!
//! # Key invariants
//! - Missing header, non-`Bearer` scheme, or an empty token fail with
//!   [`AuthError::Authentication`] before validation is attempted.
//! - A valid credential lacking the permission fails with
//!   [`AuthError::Authorization`]; the operation is not invoked.
//! - On success the operation runs exactly once and its result passes through
//!   unchanged.
use crate::auth::{AuthError, AuthService};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use brickx_authz::Claims;
use std::future::Future;

const BEARER_PREFIX: &str = "Bearer ";

/// Pull the bearer token out of an `Authorization` header.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthError::Authentication("authorization header required".to_string()))?;
    let value = value
        .to_str()
        .map_err(|_| AuthError::Authentication("invalid authorization format".to_string()))?;
    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or_else(|| AuthError::Authentication("invalid authorization format".to_string()))?
        .trim();
    if token.is_empty() {
        return Err(AuthError::Authentication(
            "invalid authorization format".to_string(),
        ));
    }
    Ok(token)
}

#[derive(Clone, Copy)]
pub struct PermissionGate<'a> {
    auth: &'a AuthService,
    permission: &'a str,
}

impl AuthService {
    pub fn gate<'a>(&'a self, permission: &'a str) -> PermissionGate<'a> {
        PermissionGate {
            auth: self,
            permission,
        }
    }

    /// Validate the bearer credential carried by `headers`.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let token = extract_bearer(headers).inspect_err(|_| record_denied("unauthenticated"))?;
        self.validate(token)
            .inspect_err(|_| record_denied("invalid_token"))
    }
}

impl<'a> PermissionGate<'a> {
    /// Authenticate and check the permission without running anything.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let claims = self.auth.authenticate(headers)?;
        if !claims.has_permission(self.permission) {
            record_denied("forbidden");
            tracing::info!(
                subject = %claims.sub,
                permission = self.permission,
                "permission denied"
            );
            return Err(AuthError::Authorization {
                permission: self.permission.to_string(),
            });
        }
        Ok(claims)
    }

    /// Run `operation` with the caller's claims once the gate passes.
    pub async fn run<F, Fut, T, E>(&self, headers: &HeaderMap, operation: F) -> Result<T, E>
    where
        F: FnOnce(Claims) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AuthError>,
    {
        let claims = self.authorize(headers)?;
        operation(claims).await
    }
}

fn record_denied(reason: &'static str) {
    metrics::counter!("brickx_auth_gate_denied_total", "reason" => reason).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::external::DisabledExternalVerifier;
    use crate::auth::password;
    use crate::auth::service::AuthSettings;
    use crate::model::{Role, User};
    use crate::store::RbacStore;
    use crate::store::memory::InMemoryStore;
    use axum::http::HeaderValue;
    use brickx_authz::SigningKeyPair;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn auth_with_user(perms: &[&str]) -> AuthService {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_role(Role::new(
                "r",
                perms.iter().map(|p| p.to_string()).collect(),
            ))
            .await
            .expect("role");
        store
            .create_user(User {
                username: "alice".to_string(),
                password_hash: password::hash_password("pw").expect("hash"),
                role: "r".to_string(),
            })
            .await
            .expect("user");
        AuthService::new(
            store,
            SigningKeyPair::from_seed([21u8; 32]),
            Arc::new(DisabledExternalVerifier),
            AuthSettings::default(),
        )
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
        );
        headers
    }

    #[test]
    fn extract_bearer_cases() {
        let headers = HeaderMap::new();
        assert!(matches!(
            extract_bearer(&headers),
            Err(AuthError::Authentication(_))
        ));

        let mut basic = HeaderMap::new();
        basic.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer(&basic).is_err());

        let mut lower = HeaderMap::new();
        lower.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc"));
        assert!(extract_bearer(&lower).is_err());

        let mut empty = HeaderMap::new();
        empty.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(extract_bearer(&empty).is_err());

        assert_eq!(extract_bearer(&bearer("tok")).expect("token"), "tok");
    }

    #[tokio::test]
    async fn gate_runs_operation_exactly_once_when_permitted() {
        let auth = auth_with_user(&["user:read"]).await;
        let token = auth.issue_local("alice", "pw").await.expect("login").token;
        let calls = AtomicUsize::new(0);
        let result: Result<&str, AuthError> = auth
            .gate("user:read")
            .run(&bearer(&token), |claims| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    assert_eq!(claims.sub, "alice");
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.expect("ran"), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gate_never_runs_operation_without_permission() {
        let auth = auth_with_user(&["user:read"]).await;
        let token = auth.issue_local("alice", "pw").await.expect("login").token;
        let calls = AtomicUsize::new(0);
        let result: Result<(), AuthError> = auth
            .gate("user:write")
            .run(&bearer(&token), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;
        assert!(matches!(
            result,
            Err(AuthError::Authorization { ref permission }) if permission == "user:write"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn gate_matches_exactly_not_by_prefix() {
        let auth = auth_with_user(&["x/layout:read"]).await;
        let token = auth.issue_local("alice", "pw").await.expect("login").token;
        let headers = bearer(&token);
        assert!(auth.gate("x/layout:read").authorize(&headers).is_ok());
        assert!(matches!(
            auth.gate("x/layout").authorize(&headers),
            Err(AuthError::Authorization { .. })
        ));
        assert!(matches!(
            auth.gate("x/layout:read:extra").authorize(&headers),
            Err(AuthError::Authorization { .. })
        ));
    }

    #[tokio::test]
    async fn gate_rejects_missing_or_invalid_credentials_as_authentication() {
        let auth = auth_with_user(&["user:read"]).await;
        let gate = auth.gate("user:read");
        assert!(matches!(
            gate.authorize(&HeaderMap::new()),
            Err(AuthError::Authentication(_))
        ));
        assert!(matches!(
            gate.authorize(&bearer("not.a.token")),
            Err(AuthError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn operation_errors_pass_through() {
        let auth = auth_with_user(&["role:write"]).await;
        let token = auth.issue_local("alice", "pw").await.expect("login").token;
        let result: Result<(), AuthError> = auth
            .gate("role:write")
            .run(&bearer(&token), |_| async {
                Err(AuthError::Internal("op failed".to_string()))
            })
            .await;
        assert!(matches!(result, Err(AuthError::Internal(msg)) if msg == "op failed"));
    }
}
