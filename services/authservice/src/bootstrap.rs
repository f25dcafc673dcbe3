//! First-start seeding of the admin account.
//!
//! # Purpose
//! On a fresh store, registers the built-in permissions, an `admin` role that
//! holds all of them, and the configured admin user, so the API is usable
//! without direct database access.
//!
//! # Key invariants
//! - Nothing happens unless admin credentials are configured and the admin
//!   user does not exist yet.
//! - Existing records are never overwritten; a conflicting create is skipped.
//! - Operator-added permission strings survive; built-ins are merged in.
use crate::auth::permissions::BUILTIN;
use crate::auth::{AuthError, AuthService};
use crate::config::BootstrapConfig;
use crate::model::{Role, User};
use crate::store::StoreError;

pub const ADMIN_ROLE: &str = "admin";

/// What a bootstrap run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapOutcome {
    pub permissions_seeded: bool,
    pub role_created: bool,
    pub user_created: bool,
}

pub async fn seed_admin(
    auth: &AuthService,
    config: &BootstrapConfig,
) -> Result<BootstrapOutcome, AuthError> {
    let Some((username, password)) = config.admin_credentials() else {
        tracing::debug!("no bootstrap admin configured");
        return Ok(BootstrapOutcome::default());
    };
    let store = auth.store();
    match store.get_user(username).await {
        Ok(_) => {
            tracing::debug!(username, "bootstrap admin already present");
            return Ok(BootstrapOutcome::default());
        }
        Err(StoreError::NotFound(_)) => {}
        Err(err) => return Err(err.into()),
    }

    let mut outcome = BootstrapOutcome::default();

    let existing = store.list_permissions().await?;
    if BUILTIN.iter().any(|perm| !existing.iter().any(|have| have == perm)) {
        let mut merged = existing;
        merged.extend(BUILTIN.iter().map(|perm| perm.to_string()));
        store.set_permissions(merged).await?;
        outcome.permissions_seeded = true;
    }

    let admin_role = Role::new(ADMIN_ROLE, BUILTIN.iter().map(|p| p.to_string()).collect());
    outcome.role_created = ignore_conflict(store.create_role(admin_role).await)?;

    let password_hash = auth.hash_password(password).await?;
    outcome.user_created = ignore_conflict(
        store
            .create_user(User {
                username: username.to_string(),
                password_hash,
                role: ADMIN_ROLE.to_string(),
            })
            .await,
    )?;

    tracing::info!(
        username,
        permissions_seeded = outcome.permissions_seeded,
        role_created = outcome.role_created,
        user_created = outcome.user_created,
        "bootstrap admin seeded"
    );
    Ok(outcome)
}

fn ignore_conflict<T>(result: Result<T, StoreError>) -> Result<bool, StoreError> {
    match result {
        Ok(_) => Ok(true),
        Err(StoreError::Conflict(_)) => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::external::DisabledExternalVerifier;
    use crate::auth::service::AuthSettings;
    use crate::store::RbacStore;
    use crate::store::memory::InMemoryStore;
    use brickx_authz::SigningKeyPair;
    use std::sync::Arc;

    fn auth(store: Arc<InMemoryStore>) -> AuthService {
        AuthService::new(
            store,
            SigningKeyPair::from_seed([33u8; 32]),
            Arc::new(DisabledExternalVerifier),
            AuthSettings::default(),
        )
    }

    fn admin_config() -> BootstrapConfig {
        BootstrapConfig {
            admin_username: Some("root".to_string()),
            admin_password: Some("changeme".to_string()),
        }
    }

    #[tokio::test]
    async fn seeds_fresh_store_and_admin_can_log_in() {
        let store = Arc::new(InMemoryStore::new());
        let auth = auth(store.clone());
        let outcome = seed_admin(&auth, &admin_config()).await.expect("seed");
        assert!(outcome.permissions_seeded && outcome.role_created && outcome.user_created);

        let perms = store.list_permissions().await.expect("perms");
        for builtin in BUILTIN {
            assert!(perms.iter().any(|p| p == builtin), "missing {builtin}");
        }
        let issued = auth.issue_local("root", "changeme").await.expect("login");
        assert_eq!(issued.claims.role, ADMIN_ROLE);
        assert_eq!(issued.claims.permissions.len(), BUILTIN.len());
    }

    #[tokio::test]
    async fn skipped_without_credentials_or_when_admin_exists() {
        let store = Arc::new(InMemoryStore::new());
        let auth = auth(store.clone());
        let outcome = seed_admin(&auth, &BootstrapConfig::default())
            .await
            .expect("noop");
        assert_eq!(outcome, BootstrapOutcome::default());
        assert!(store.list_users().await.expect("users").is_empty());

        seed_admin(&auth, &admin_config()).await.expect("seed");
        let again = seed_admin(&auth, &admin_config()).await.expect("reseed");
        assert_eq!(again, BootstrapOutcome::default());
    }

    #[tokio::test]
    async fn keeps_existing_role_and_extra_permissions() {
        let store = Arc::new(InMemoryStore::new());
        store
            .set_permissions(vec!["reports:read".to_string()])
            .await
            .expect("perms");
        store
            .create_role(Role::new(ADMIN_ROLE, vec!["user:read".to_string()]))
            .await
            .expect("role");
        let auth = auth(store.clone());
        let outcome = seed_admin(&auth, &admin_config()).await.expect("seed");
        assert!(!outcome.role_created);
        assert!(outcome.user_created);

        let role = store.get_role(ADMIN_ROLE).await.expect("role");
        assert_eq!(role.permissions, vec!["user:read"]);
        let perms = store.list_permissions().await.expect("perms");
        assert!(perms.iter().any(|p| p == "reports:read"));
        assert!(perms.iter().any(|p| p == "x/layout:write"));
    }
}
