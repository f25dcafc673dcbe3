//! The long-lived auth service object shared by every request handler.
//!
//! Holds the store handle, the signing and verifying halves of the service
//! key, and the external verifier. Cloning is cheap; all clones share the same
//! store and verifier.
use crate::auth::external::{ExternalVerifier, PrincipalIdentity};
use crate::auth::{AuthError, password};
use crate::store::{RbacStore, StoreError};
use brickx_authz::{Claims, CredentialSource, IssuedToken, SigningKeyPair, TokenSigner, TokenVerifier};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ISSUER: &str = "brickx-auth";
pub const DEFAULT_AUDIENCE: &str = "brickx-services";

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub issuer: String,
    pub audience: String,
    pub token_ttl: Duration,
    pub leeway_seconds: u64,
    /// Role assigned to exchanged principals that have no local user record.
    pub default_role: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            token_ttl: Duration::from_secs(24 * 3600),
            leeway_seconds: 0,
            default_role: None,
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn RbacStore + Send + Sync>,
    signer: TokenSigner,
    verifier: TokenVerifier,
    external: Arc<dyn ExternalVerifier>,
    default_role: Option<String>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn RbacStore + Send + Sync>,
        key: SigningKeyPair,
        external: Arc<dyn ExternalVerifier>,
        settings: AuthSettings,
    ) -> Self {
        let verifier = TokenVerifier::new(
            settings.issuer.clone(),
            settings.audience.clone(),
            settings.leeway_seconds,
            key.verifying_key(),
        );
        let signer = TokenSigner::new(settings.issuer, settings.audience, settings.token_ttl, key);
        if !password::prime_dummy_hash() {
            tracing::warn!("dummy password hash unavailable; unknown-user logins hash instead");
        }
        Self {
            store,
            signer,
            verifier,
            external,
            default_role: settings.default_role,
        }
    }

    pub fn store(&self) -> &Arc<dyn RbacStore + Send + Sync> {
        &self.store
    }

    /// Authenticate a local user and mint a credential carrying the user's
    /// role and the role's current permission set.
    ///
    /// # Errors
    /// - [`AuthError::Authentication`] for an unknown user or wrong password,
    ///   with the same message in both cases.
    /// - [`AuthError::Store`] / [`AuthError::Internal`] for backend failures.
    pub async fn issue_local(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedToken, AuthError> {
        let user = match self.store.get_user(username).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                let password = password.to_string();
                let _ = tokio::task::spawn_blocking(move || password::verify_dummy(&password)).await;
                record_login("failure");
                tracing::info!(username, "login rejected");
                return Err(AuthError::authentication_failed());
            }
            Err(err) => {
                record_login("error");
                return Err(err.into());
            }
        };

        let hash = user.password_hash.clone();
        let candidate = password.to_string();
        let verified =
            tokio::task::spawn_blocking(move || password::verify_password(&hash, &candidate))
                .await
                .map_err(|err| AuthError::Internal(format!("password verification task: {err}")))?;
        if !verified {
            record_login("failure");
            tracing::info!(username, "login rejected");
            return Err(AuthError::authentication_failed());
        }

        let permissions = self.role_permissions(&user.role).await?;
        let issued = self.sign(&user.username, &user.role, permissions, CredentialSource::Local)?;
        record_login("success");
        tracing::info!(username, role = %user.role, "credential issued");
        Ok(issued)
    }

    /// Exchange an upstream credential for a locally signed one.
    ///
    /// The role comes from the local user record named by the upstream
    /// subject, then the first upstream group naming an existing role, then
    /// the configured default role.
    pub async fn exchange(&self, external_token: &str) -> Result<IssuedToken, AuthError> {
        let principal = match self.external.verify_external(external_token).await {
            Ok(principal) => principal,
            Err(err) => {
                record_exchange("rejected");
                tracing::info!(error = %err, "external credential rejected");
                return Err(AuthError::authentication_failed());
            }
        };

        let role = match self.exchange_role(&principal).await {
            Ok(Some(role)) => role,
            Ok(None) => {
                record_exchange("no_role");
                tracing::info!(
                    issuer = %principal.issuer,
                    subject = %principal.subject,
                    groups = ?principal.groups,
                    "exchanged principal has no local role"
                );
                return Err(AuthError::authentication_failed());
            }
            Err(err) => {
                record_exchange("error");
                return Err(err);
            }
        };

        let permissions = self.role_permissions(&role).await?;
        let issued = self.sign(&principal.subject, &role, permissions, CredentialSource::Exchanged)?;
        record_exchange("success");
        tracing::info!(
            issuer = %principal.issuer,
            subject = %principal.subject,
            role = %role,
            "credential exchanged"
        );
        Ok(issued)
    }

    async fn exchange_role(&self, principal: &PrincipalIdentity) -> Result<Option<String>, AuthError> {
        match self.store.get_user(&principal.subject).await {
            Ok(user) => return Ok(Some(user.role)),
            Err(StoreError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }
        for group in &principal.groups {
            match self.store.get_role(group).await {
                Ok(role) => return Ok(Some(role.name)),
                Err(StoreError::NotFound(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(self.default_role.clone())
    }

    /// Verify signature and expiry and return the embedded claims.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        self.verifier.verify(token).map_err(|err| {
            if err.is_credential_error() {
                tracing::debug!(error = %err, "credential rejected");
                AuthError::Authentication("invalid token".to_string())
            } else {
                AuthError::Internal(err.to_string())
            }
        })
    }

    /// Hash a password for storage off the async executor.
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || password::hash_password(&password))
            .await
            .map_err(|err| AuthError::Internal(format!("password hashing task: {err}")))?
            .map_err(|err| AuthError::Internal(err.to_string()))
    }

    async fn role_permissions(&self, role: &str) -> Result<Vec<String>, AuthError> {
        match self.store.get_role(role).await {
            Ok(role) => Ok(role.permissions),
            Err(StoreError::NotFound(_)) => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn sign(
        &self,
        subject: &str,
        role: &str,
        permissions: Vec<String>,
        source: CredentialSource,
    ) -> Result<IssuedToken, AuthError> {
        self.signer
            .sign(subject, role, permissions, source)
            .map_err(|err| AuthError::Internal(format!("sign credential: {err}")))
    }
}

fn record_login(outcome: &'static str) {
    metrics::counter!("brickx_auth_login_total", "outcome" => outcome).increment(1);
}

fn record_exchange(outcome: &'static str) {
    metrics::counter!("brickx_auth_exchange_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::external::{DisabledExternalVerifier, ExternalError};
    use crate::model::{Role, User};
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;

    struct StaticVerifier(Result<PrincipalIdentity, String>);

    #[async_trait]
    impl ExternalVerifier for StaticVerifier {
        async fn verify_external(&self, _token: &str) -> Result<PrincipalIdentity, ExternalError> {
            self.0.clone().map_err(ExternalError::Rejected)
        }
    }

    fn principal(subject: &str) -> PrincipalIdentity {
        principal_in(subject, &[])
    }

    fn principal_in(subject: &str, groups: &[&str]) -> PrincipalIdentity {
        PrincipalIdentity {
            issuer: "https://idp.example".to_string(),
            subject: subject.to_string(),
            groups: groups.iter().map(|group| group.to_string()).collect(),
        }
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_role(Role::new(
                "editor",
                vec!["user:read".to_string(), "role:read".to_string()],
            ))
            .await
            .expect("role");
        store
            .create_user(User {
                username: "alice".to_string(),
                password_hash: password::hash_password("correct horse").expect("hash"),
                role: "editor".to_string(),
            })
            .await
            .expect("user");
        store
    }

    fn service(
        store: Arc<InMemoryStore>,
        external: Arc<dyn ExternalVerifier>,
        default_role: Option<&str>,
    ) -> AuthService {
        AuthService::new(
            store,
            SigningKeyPair::from_seed([11u8; 32]),
            external,
            AuthSettings {
                default_role: default_role.map(str::to_string),
                ..AuthSettings::default()
            },
        )
    }

    #[tokio::test]
    async fn issue_local_embeds_role_permissions() {
        let auth = service(seeded_store().await, Arc::new(DisabledExternalVerifier), None);
        let issued = auth.issue_local("alice", "correct horse").await.expect("login");
        assert_eq!(issued.claims.sub, "alice");
        assert_eq!(issued.claims.role, "editor");
        assert_eq!(issued.claims.permissions, vec!["user:read", "role:read"]);
        assert_eq!(issued.claims.src, CredentialSource::Local);
        assert_eq!(issued.claims.exp - issued.claims.iat, 24 * 3600);

        let claims = auth.validate(&issued.token).expect("valid");
        assert_eq!(claims, issued.claims);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_fail_identically() {
        let auth = service(seeded_store().await, Arc::new(DisabledExternalVerifier), None);
        let wrong = auth.issue_local("alice", "wrongpass").await.expect_err("wrong");
        let missing = auth.issue_local("mallory", "wrongpass").await.expect_err("missing");
        assert_eq!(wrong.to_string(), missing.to_string());
        assert!(matches!(wrong, AuthError::Authentication(_)));
        assert!(matches!(missing, AuthError::Authentication(_)));
    }

    #[tokio::test]
    async fn missing_role_yields_empty_permissions() {
        let store = seeded_store().await;
        store
            .create_user(User {
                username: "bob".to_string(),
                password_hash: password::hash_password("pw").expect("hash"),
                role: "ghost-role".to_string(),
            })
            .await
            .expect("user");
        let auth = service(store, Arc::new(DisabledExternalVerifier), None);
        let issued = auth.issue_local("bob", "pw").await.expect("login");
        assert_eq!(issued.claims.role, "ghost-role");
        assert!(issued.claims.permissions.is_empty());
    }

    #[tokio::test]
    async fn permission_snapshot_is_frozen_at_issuance() {
        let store = seeded_store().await;
        let auth = service(store.clone(), Arc::new(DisabledExternalVerifier), None);
        let issued = auth.issue_local("alice", "correct horse").await.expect("login");
        store
            .update_role_permissions("editor", Vec::new())
            .await
            .expect("revoke");
        let claims = auth.validate(&issued.token).expect("still valid");
        assert!(claims.has_permission("user:read"));
    }

    #[tokio::test]
    async fn exchange_uses_local_user_role() {
        let auth = service(
            seeded_store().await,
            Arc::new(StaticVerifier(Ok(principal("alice")))),
            Some("viewer"),
        );
        let issued = auth.exchange("upstream").await.expect("exchange");
        assert_eq!(issued.claims.sub, "alice");
        assert_eq!(issued.claims.role, "editor");
        assert_eq!(issued.claims.src, CredentialSource::Exchanged);
        auth.validate(&issued.token).expect("valid");
    }

    #[tokio::test]
    async fn exchange_falls_back_to_default_role() {
        let auth = service(
            seeded_store().await,
            Arc::new(StaticVerifier(Ok(principal("sso-user")))),
            Some("editor"),
        );
        let issued = auth.exchange("upstream").await.expect("exchange");
        assert_eq!(issued.claims.sub, "sso-user");
        assert_eq!(issued.claims.role, "editor");
        assert_eq!(issued.claims.permissions, vec!["user:read", "role:read"]);
    }

    #[tokio::test]
    async fn exchange_maps_first_known_group_to_role() {
        let auth = service(
            seeded_store().await,
            Arc::new(StaticVerifier(Ok(principal_in(
                "sso-user",
                &["contractors", "editor", "admin"],
            )))),
            None,
        );
        let issued = auth.exchange("upstream").await.expect("exchange");
        assert_eq!(issued.claims.role, "editor");
        assert_eq!(issued.claims.permissions, vec!["user:read", "role:read"]);
    }

    #[tokio::test]
    async fn exchange_prefers_local_user_over_groups() {
        let store = seeded_store().await;
        store
            .create_role(Role::new("auditor", vec!["permission:read".to_string()]))
            .await
            .expect("role");
        let auth = service(
            store,
            Arc::new(StaticVerifier(Ok(principal_in("alice", &["auditor"])))),
            None,
        );
        let issued = auth.exchange("upstream").await.expect("exchange");
        assert_eq!(issued.claims.role, "editor");
    }

    #[tokio::test]
    async fn exchange_with_unknown_groups_uses_default_role() {
        let store = seeded_store().await;
        store
            .create_role(Role::new("guest", Vec::new()))
            .await
            .expect("role");
        let auth = service(
            store,
            Arc::new(StaticVerifier(Ok(principal_in("sso-user", &["nobody-knows"])))),
            Some("guest"),
        );
        let issued = auth.exchange("upstream").await.expect("exchange");
        assert_eq!(issued.claims.role, "guest");
        assert!(issued.claims.permissions.is_empty());
    }

    #[tokio::test]
    async fn exchange_without_role_fails() {
        let auth = service(
            seeded_store().await,
            Arc::new(StaticVerifier(Ok(principal("sso-user")))),
            None,
        );
        let err = auth.exchange("upstream").await.expect_err("no role");
        assert!(matches!(err, AuthError::Authentication(_)));
    }

    #[tokio::test]
    async fn exchange_hides_upstream_error_detail() {
        let auth = service(
            seeded_store().await,
            Arc::new(StaticVerifier(Err("signature mismatch at idp".to_string()))),
            Some("editor"),
        );
        let err = auth.exchange("upstream").await.expect_err("rejected");
        assert_eq!(err.to_string(), "authentication failed");
    }

    #[tokio::test]
    async fn validate_rejects_garbage_as_authentication_error() {
        let auth = service(seeded_store().await, Arc::new(DisabledExternalVerifier), None);
        let err = auth.validate("garbage").expect_err("invalid");
        assert!(matches!(err, AuthError::Authentication(_)));
    }

    #[tokio::test]
    async fn validate_rejects_credentials_from_other_keys() {
        let store = seeded_store().await;
        let other = AuthService::new(
            store.clone(),
            SigningKeyPair::from_seed([12u8; 32]),
            Arc::new(DisabledExternalVerifier),
            AuthSettings::default(),
        );
        let issued = other.issue_local("alice", "correct horse").await.expect("login");
        let auth = service(store, Arc::new(DisabledExternalVerifier), None);
        assert!(matches!(
            auth.validate(&issued.token),
            Err(AuthError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn hash_password_never_returns_plaintext() {
        let auth = service(seeded_store().await, Arc::new(DisabledExternalVerifier), None);
        let hash = auth.hash_password("plain").await.expect("hash");
        assert_ne!(hash, "plain");
        assert!(password::verify_password(&hash, "plain"));
    }
}
