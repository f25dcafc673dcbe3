//! In-memory implementation of the RBAC store.
//!
//! # Purpose
//! Implements [`RbacStore`] with ordered maps guarded by
//! `tokio::sync::RwLock`. Used for local development, tests, and deployments
//! that do not need durability.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - Mutations take the write lock of the map they touch, so the existence
//!   check and the insert of a create are one critical section. Racing creates
//!   of the same key therefore produce exactly one `Conflict`.
//! - `set_permissions` swaps the registry under a single write lock.
//!
//! # Ordering
//! Lists come back sorted by key, matching the Postgres backend's `ORDER BY`.
use super::{RbacStore, StoreError, StoreResult};
use crate::model::{Role, User, UserPatch};
use async_trait::async_trait;
use brickx_authz::normalize_permissions;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryStore {
    users: Arc<RwLock<BTreeMap<String, User>>>,
    roles: Arc<RwLock<BTreeMap<String, Role>>>,
    permissions: Arc<RwLock<BTreeSet<String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RbacStore for InMemoryStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn get_user(&self, username: &str) -> StoreResult<User> {
        self.users
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("user".into()))
    }

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(StoreError::Conflict("user exists".into()));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn update_user(&self, username: &str, patch: UserPatch) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(username)
            .ok_or_else(|| StoreError::NotFound("user".into()))?;
        patch.apply(user);
        Ok(user.clone())
    }

    async fn delete_user(&self, username: &str) -> StoreResult<()> {
        if self.users.write().await.remove(username).is_none() {
            return Err(StoreError::NotFound("user".into()));
        }
        Ok(())
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(self.roles.read().await.values().cloned().collect())
    }

    async fn get_role(&self, name: &str) -> StoreResult<Role> {
        self.roles
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("role".into()))
    }

    async fn create_role(&self, role: Role) -> StoreResult<Role> {
        let role = Role::new(role.name, role.permissions);
        let mut roles = self.roles.write().await;
        if roles.contains_key(&role.name) {
            return Err(StoreError::Conflict("role exists".into()));
        }
        roles.insert(role.name.clone(), role.clone());
        Ok(role)
    }

    async fn update_role_permissions(
        &self,
        name: &str,
        permissions: Vec<String>,
    ) -> StoreResult<Role> {
        let mut roles = self.roles.write().await;
        let role = roles
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound("role".into()))?;
        role.permissions = normalize_permissions(permissions);
        Ok(role.clone())
    }

    async fn delete_role(&self, name: &str) -> StoreResult<()> {
        if self.roles.write().await.remove(name).is_none() {
            return Err(StoreError::NotFound("role".into()));
        }
        Ok(())
    }

    async fn list_permissions(&self) -> StoreResult<Vec<String>> {
        Ok(self.permissions.read().await.iter().cloned().collect())
    }

    async fn set_permissions(&self, permissions: Vec<String>) -> StoreResult<Vec<String>> {
        let next: BTreeSet<String> = permissions.into_iter().collect();
        let mut registry = self.permissions.write().await;
        *registry = next;
        Ok(registry.iter().cloned().collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, role: &str) -> User {
        User {
            username: name.to_string(),
            password_hash: format!("$argon2id$hash-for-{name}"),
            role: role.to_string(),
        }
    }

    fn perms(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn user_crud_roundtrip() {
        let store = InMemoryStore::new();
        store.create_user(user("bob", "viewer")).await.expect("bob");
        store.create_user(user("alice", "admin")).await.expect("alice");

        let fetched = store.get_user("alice").await.expect("get");
        assert_eq!(fetched.role, "admin");

        let listed = store.list_users().await.expect("list");
        let names: Vec<_> = listed.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);

        let updated = store
            .update_user(
                "bob",
                UserPatch {
                    password_hash: None,
                    role: Some("editor".to_string()),
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.role, "editor");
        assert_eq!(updated.password_hash, "$argon2id$hash-for-bob");

        store.delete_user("bob").await.expect("delete");
        let err = store.get_user("bob").await.expect_err("gone");
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn user_errors() {
        let store = InMemoryStore::new();
        store.create_user(user("alice", "admin")).await.expect("alice");

        let err = store
            .create_user(user("alice", "viewer"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.get_user("alice").await.expect("kept").role, "admin");

        let err = store
            .update_user("ghost", UserPatch::default())
            .await
            .expect_err("missing");
        assert!(matches!(err, StoreError::NotFound(_)));

        let err = store.delete_user("ghost").await.expect_err("missing");
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_duplicate_create_yields_one_conflict() {
        let store = InMemoryStore::new();
        let a = store.clone();
        let b = store.clone();
        let (first, second) = tokio::join!(
            tokio::spawn(async move { a.create_user(user("alice", "admin")).await }),
            tokio::spawn(async move { b.create_user(user("alice", "viewer")).await }),
        );
        let results = [first.expect("join"), second.expect("join")];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::Conflict(_))))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(store.list_users().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn role_crud_replaces_permissions() {
        let store = InMemoryStore::new();
        let created = store
            .create_role(Role {
                name: "editor".to_string(),
                permissions: perms(&["user:read", "user:read", "role:read"]),
            })
            .await
            .expect("create");
        assert_eq!(created.permissions, perms(&["user:read", "role:read"]));

        let err = store
            .create_role(Role::new("editor", Vec::new()))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict(_)));

        let updated = store
            .update_role_permissions("editor", perms(&["x/layout:read"]))
            .await
            .expect("update");
        assert_eq!(updated.permissions, perms(&["x/layout:read"]));
        assert_eq!(
            store.get_role("editor").await.expect("get").permissions,
            perms(&["x/layout:read"])
        );

        let err = store
            .update_role_permissions("ghost", Vec::new())
            .await
            .expect_err("missing");
        assert!(matches!(err, StoreError::NotFound(_)));

        store.delete_role("editor").await.expect("delete");
        let err = store.delete_role("editor").await.expect_err("gone");
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.list_roles().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn set_permissions_replaces_registry() {
        let store = InMemoryStore::new();
        store
            .set_permissions(perms(&["role:read", "role:write", "user:read"]))
            .await
            .expect("seed");

        let stored = store
            .set_permissions(perms(&["user:read", "user:write", "user:read"]))
            .await
            .expect("replace");
        assert_eq!(stored, perms(&["user:read", "user:write"]));
        assert_eq!(
            store.list_permissions().await.expect("list"),
            perms(&["user:read", "user:write"])
        );

        store.set_permissions(Vec::new()).await.expect("clear");
        assert!(store.list_permissions().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn user_role_reference_is_not_validated() {
        let store = InMemoryStore::new();
        store
            .create_user(user("carol", "no-such-role"))
            .await
            .expect("loose reference allowed");
        assert!(!store.is_durable());
        assert_eq!(store.backend_name(), "memory");
        store.health_check().await.expect("healthy");
    }
}
