//! Postgres-backed implementation of the RBAC store.
//!
//! # Purpose
//! Durable, shared storage for users, roles and the permission registry,
//! using `sqlx` with embedded migrations.
//!
//! # Key invariants
//! - Primary keys (`users.username`, `roles.name`, `permissions.name`) enforce
//!   uniqueness. A unique violation (SQLSTATE `23505`) surfaces as
//!   [`StoreError::Conflict`], so of two racing creates exactly one commits.
//! - `set_permissions` deletes and re-inserts the registry inside one
//!   transaction; concurrent readers see either the old or the new registry.
//! - Role permissions are stored as a JSONB array.
//!
//! # Security notes
//! - Database URLs may contain credentials; never log them.
//! - Password hashes are stored as-is; plaintext never reaches this layer.
use super::{RbacStore, StoreError, StoreResult};
use crate::config::PostgresConfig;
use crate::model::{Role, User, UserPatch};
use anyhow::anyhow;
use async_trait::async_trait;
use brickx_authz::normalize_permissions;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, FromRow)]
struct DbUser {
    username: String,
    password_hash: String,
    role: String,
}

#[derive(Debug, Clone, FromRow)]
struct DbRole {
    name: String,
    permissions: Json<Vec<String>>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        User {
            username: row.username,
            password_hash: row.password_hash,
            role: row.role,
        }
    }
}

impl From<DbRole> for Role {
    fn from(row: DbRole) -> Self {
        Role::new(row.name, row.permissions.0)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(err.into())
    }
}

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect, run migrations, and return a ready store.
    ///
    /// # Errors
    /// - Invalid URL, connect timeout, pool acquisition failure, or a failed
    ///   migration.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, true).await
    }

    /// Connect without running migrations, for callers that manage the schema
    /// themselves.
    pub async fn connect_without_migrations(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, false).await
    }

    async fn connect_internal(pg: &PostgresConfig, run_migrations: bool) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let connect = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options);
        let pool = tokio::time::timeout(Duration::from_millis(pg.connect_timeout_ms), connect)
            .await
            .map_err(|_| StoreError::Unexpected(anyhow!("postgres connect timed out")))??;

        if run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
        }
        Ok(Self { pool })
    }
}

#[async_trait]
impl RbacStore for PostgresStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, DbUser>(
            "SELECT username, password_hash, role FROM users ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn get_user(&self, username: &str) -> StoreResult<User> {
        let row = sqlx::query_as::<_, DbUser>(
            "SELECT username, password_hash, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::from)
            .ok_or_else(|| StoreError::NotFound("user".into()))
    }

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let insert = sqlx::query(
            "INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3)",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.role)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("user exists".into()));
            }
            return Err(err.into());
        }
        Ok(user)
    }

    async fn update_user(&self, username: &str, patch: UserPatch) -> StoreResult<User> {
        let row = sqlx::query_as::<_, DbUser>(
            r#"UPDATE users
               SET password_hash = COALESCE($2, password_hash),
                   role = COALESCE($3, role)
               WHERE username = $1
               RETURNING username, password_hash, role"#,
        )
        .bind(username)
        .bind(patch.password_hash)
        .bind(patch.role)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::from)
            .ok_or_else(|| StoreError::NotFound("user".into()))
    }

    async fn delete_user(&self, username: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user".into()));
        }
        Ok(())
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, DbRole>("SELECT name, permissions FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn get_role(&self, name: &str) -> StoreResult<Role> {
        let row = sqlx::query_as::<_, DbRole>("SELECT name, permissions FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Role::from)
            .ok_or_else(|| StoreError::NotFound("role".into()))
    }

    async fn create_role(&self, role: Role) -> StoreResult<Role> {
        let role = Role::new(role.name, role.permissions);
        let insert = sqlx::query("INSERT INTO roles (name, permissions) VALUES ($1, $2)")
            .bind(&role.name)
            .bind(Json(&role.permissions))
            .execute(&self.pool)
            .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("role exists".into()));
            }
            return Err(err.into());
        }
        Ok(role)
    }

    async fn update_role_permissions(
        &self,
        name: &str,
        permissions: Vec<String>,
    ) -> StoreResult<Role> {
        let permissions = normalize_permissions(permissions);
        let row = sqlx::query_as::<_, DbRole>(
            "UPDATE roles SET permissions = $2 WHERE name = $1 RETURNING name, permissions",
        )
        .bind(name)
        .bind(Json(&permissions))
        .fetch_optional(&self.pool)
        .await?;
        row.map(Role::from)
            .ok_or_else(|| StoreError::NotFound("role".into()))
    }

    async fn delete_role(&self, name: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM roles WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("role".into()));
        }
        Ok(())
    }

    async fn list_permissions(&self) -> StoreResult<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>("SELECT name FROM permissions ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn set_permissions(&self, permissions: Vec<String>) -> StoreResult<Vec<String>> {
        let permissions = normalize_permissions(permissions);
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM permissions")
            .execute(&mut *tx)
            .await?;
        for name in &permissions {
            sqlx::query("INSERT INTO permissions (name) VALUES ($1)")
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }
        let stored = sqlx::query_scalar::<_, String>("SELECT name FROM permissions ORDER BY name")
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}
