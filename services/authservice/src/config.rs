//! Service configuration.
//!
//! Values come from `BRICKX_AUTH_*` environment variables with defaults, then
//! an optional YAML (or JSON) file named by `BRICKX_AUTH_CONFIG` overrides
//! individual fields. The file keeps the legacy `server`/`jwt` layout.
use crate::auth::idp::ExternalIssuerConfig;
use crate::auth::service::{DEFAULT_AUDIENCE, DEFAULT_ISSUER};
use crate::model::AuthType;
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:17101";
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9101";
pub const DEFAULT_TOKEN_TTL_HOURS: u64 = 24;
/// Ten years. Anything longer is a configuration mistake.
pub const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365 * 10;
pub const DEFAULT_PG_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_PG_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_PG_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => Err(anyhow!("unknown storage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_pg_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_pg_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_pg_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_pg_max_connections() -> u32 {
    DEFAULT_PG_MAX_CONNECTIONS
}

fn default_pg_connect_timeout_ms() -> u64 {
    DEFAULT_PG_CONNECT_TIMEOUT_MS
}

fn default_pg_acquire_timeout_ms() -> u64 {
    DEFAULT_PG_ACQUIRE_TIMEOUT_MS
}

/// Admin account seeded on startup when both fields are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BootstrapConfig {
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl BootstrapConfig {
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_username, &self.admin_password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some((user.as_str(), pass.as_str()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub private_key_path: Option<PathBuf>,
    pub public_key_path: Option<PathBuf>,
    pub issuer: String,
    pub audience: String,
    pub token_ttl_hours: u64,
    pub leeway_seconds: u64,
    pub default_role: Option<String>,
    pub auth_type: AuthType,
    pub exchange_issuers: Vec<ExternalIssuerConfig>,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverride {
    server: Option<ServerOverride>,
    jwt: Option<JwtOverride>,
    storage: Option<StorageBackend>,
    postgres: Option<PostgresConfig>,
    exchange: Option<ExchangeOverride>,
    auth_type: Option<AuthType>,
    bootstrap: Option<BootstrapConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerOverride {
    port: Option<u16>,
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct JwtOverride {
    private_key_path: Option<PathBuf>,
    public_key_path: Option<PathBuf>,
    expiration_hours: Option<u64>,
    leeway_seconds: Option<u64>,
    issuer: Option<String>,
    audience: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExchangeOverride {
    #[serde(default)]
    issuers: Vec<ExternalIssuerConfig>,
    default_role: Option<String>,
}

impl AuthServiceConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr: SocketAddr = env_or("BRICKX_AUTH_BIND", DEFAULT_BIND)
            .parse()
            .with_context(|| "parse BRICKX_AUTH_BIND")?;
        let metrics_bind: SocketAddr = env_or("BRICKX_AUTH_METRICS_BIND", DEFAULT_METRICS_BIND)
            .parse()
            .with_context(|| "parse BRICKX_AUTH_METRICS_BIND")?;
        let storage: StorageBackend = env_or("BRICKX_AUTH_STORAGE", "memory")
            .parse()
            .with_context(|| "parse BRICKX_AUTH_STORAGE")?;
        let postgres = match env_opt("BRICKX_AUTH_POSTGRES_URL") {
            Some(url) => Some(PostgresConfig {
                url,
                max_connections: env_parse(
                    "BRICKX_AUTH_PG_MAX_CONNECTIONS",
                    DEFAULT_PG_MAX_CONNECTIONS,
                )?,
                connect_timeout_ms: env_parse(
                    "BRICKX_AUTH_PG_CONNECT_TIMEOUT_MS",
                    DEFAULT_PG_CONNECT_TIMEOUT_MS,
                )?,
                acquire_timeout_ms: env_parse(
                    "BRICKX_AUTH_PG_ACQUIRE_TIMEOUT_MS",
                    DEFAULT_PG_ACQUIRE_TIMEOUT_MS,
                )?,
            }),
            None => None,
        };
        let auth_type: AuthType = env_or("BRICKX_AUTH_TYPE", "local")
            .parse::<AuthType>()
            .map_err(|err: String| anyhow!(err))
            .with_context(|| "parse BRICKX_AUTH_TYPE")?;

        let token_ttl_hours: u64 =
            env_parse("BRICKX_AUTH_TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?;
        check_token_ttl_hours(token_ttl_hours, "BRICKX_AUTH_TOKEN_TTL_HOURS")?;

        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            private_key_path: env_opt("BRICKX_AUTH_PRIVATE_KEY_PATH").map(PathBuf::from),
            public_key_path: env_opt("BRICKX_AUTH_PUBLIC_KEY_PATH").map(PathBuf::from),
            issuer: env_or("BRICKX_AUTH_ISSUER", DEFAULT_ISSUER),
            audience: env_or("BRICKX_AUTH_AUDIENCE", DEFAULT_AUDIENCE),
            token_ttl_hours,
            leeway_seconds: env_parse("BRICKX_AUTH_LEEWAY_SECONDS", 0)?,
            default_role: env_opt("BRICKX_AUTH_DEFAULT_ROLE"),
            auth_type,
            exchange_issuers: Vec::new(),
            bootstrap: BootstrapConfig {
                admin_username: env_opt("BRICKX_AUTH_ADMIN_USERNAME"),
                admin_password: env_opt("BRICKX_AUTH_ADMIN_PASSWORD"),
            },
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Some(path) = env_opt("BRICKX_AUTH_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read BRICKX_AUTH_CONFIG: {path}"))?;
            config.apply_override(&contents)?;
        }
        Ok(config)
    }

    fn apply_override(&mut self, contents: &str) -> Result<()> {
        let override_cfg: ConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse auth service config")?;

        if let Some(server) = override_cfg.server {
            if let Some(value) = server.bind_addr {
                self.bind_addr = value.parse().with_context(|| "parse server.bind_addr")?;
            }
            if let Some(port) = server.port {
                self.bind_addr.set_port(port);
            }
            if let Some(value) = server.metrics_bind {
                self.metrics_bind = value.parse().with_context(|| "parse server.metrics_bind")?;
            }
        }
        if let Some(jwt) = override_cfg.jwt {
            if let Some(path) = jwt.private_key_path {
                self.private_key_path = Some(path);
            }
            if let Some(path) = jwt.public_key_path {
                self.public_key_path = Some(path);
            }
            if let Some(hours) = jwt.expiration_hours {
                self.token_ttl_hours = hours;
            }
            if let Some(leeway) = jwt.leeway_seconds {
                self.leeway_seconds = leeway;
            }
            if let Some(issuer) = jwt.issuer {
                self.issuer = issuer;
            }
            if let Some(audience) = jwt.audience {
                self.audience = audience;
            }
        }
        if let Some(storage) = override_cfg.storage {
            self.storage = storage;
        }
        if let Some(postgres) = override_cfg.postgres {
            self.postgres = Some(postgres);
        }
        if let Some(exchange) = override_cfg.exchange {
            self.exchange_issuers = exchange.issuers;
            if exchange.default_role.is_some() {
                self.default_role = exchange.default_role;
            }
        }
        if let Some(auth_type) = override_cfg.auth_type {
            self.auth_type = auth_type;
        }
        if let Some(bootstrap) = override_cfg.bootstrap {
            self.bootstrap = bootstrap;
        }
        check_token_ttl_hours(self.token_ttl_hours, "jwt.expiration_hours")?;
        Ok(())
    }

    /// Credential lifetime as a [`Duration`].
    pub fn token_ttl(&self) -> Result<Duration> {
        check_token_ttl_hours(self.token_ttl_hours, "token_ttl_hours")?;
        let secs = self
            .token_ttl_hours
            .checked_mul(3600)
            .ok_or_else(|| anyhow!("token_ttl_hours overflows"))?;
        Ok(Duration::from_secs(secs))
    }
}

fn check_token_ttl_hours(hours: u64, source: &str) -> Result<()> {
    if hours == 0 {
        return Err(anyhow!("{source} must be greater than zero"));
    }
    if hours > MAX_TOKEN_TTL_HOURS {
        return Err(anyhow!("{source} must be at most {MAX_TOKEN_TTL_HOURS}"));
    }
    Ok(())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(value) => value
            .parse()
            .map_err(|err: T::Err| anyhow!("parse {key}: {err}")),
        None => Ok(default),
    }
}
