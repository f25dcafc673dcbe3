//! RBAC persistence contract.
//!
//! # Purpose
//! [`RbacStore`] is pure persistence for users, roles and the permission
//! registry. It carries no authorization logic; callers gate access before
//! reaching it.
//!
//! # Key invariants
//! - Creates fail with [`StoreError::Conflict`] when the key exists. Racing
//!   creates of the same key yield exactly one success.
//! - Updates and deletes fail with [`StoreError::NotFound`] when the key is
//!   absent.
//! - `update_role_permissions` replaces the whole set; it never merges.
//! - `set_permissions` replaces the registry atomically. Readers never observe
//!   an empty intermediate registry.
//! - Role and permission references are not checked against each other.
use crate::model::{Role, User, UserPatch};
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait RbacStore: Send + Sync {
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn get_user(&self, username: &str) -> StoreResult<User>;
    async fn create_user(&self, user: User) -> StoreResult<User>;
    async fn update_user(&self, username: &str, patch: UserPatch) -> StoreResult<User>;
    async fn delete_user(&self, username: &str) -> StoreResult<()>;

    async fn list_roles(&self) -> StoreResult<Vec<Role>>;
    async fn get_role(&self, name: &str) -> StoreResult<Role>;
    async fn create_role(&self, role: Role) -> StoreResult<Role>;
    async fn update_role_permissions(&self, name: &str, permissions: Vec<String>)
    -> StoreResult<Role>;
    async fn delete_role(&self, name: &str) -> StoreResult<()>;

    async fn list_permissions(&self) -> StoreResult<Vec<String>>;
    async fn set_permissions(&self, permissions: Vec<String>) -> StoreResult<Vec<String>>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
