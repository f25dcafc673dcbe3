//! Auth service HTTP entry point.
//!
//! # Purpose
//! Wires configuration, signing keys, storage and the upstream verifier, seeds
//! the bootstrap admin, then serves the API and the metrics endpoint.
//!
//! # Notes
//! `build_state` keeps wiring testable and minimizes main setup logic.
use anyhow::Context;
use authservice::app::{AppState, build_router};
use authservice::auth::AuthService;
use authservice::auth::external::{DisabledExternalVerifier, ExternalVerifier};
use authservice::auth::oidc::OidcExternalVerifier;
use authservice::auth::service::AuthSettings;
use authservice::bootstrap;
use authservice::config::{AuthServiceConfig, StorageBackend};
use authservice::observability;
use authservice::store::RbacStore;
use authservice::store::memory::InMemoryStore;
use authservice::store::postgres::PostgresStore;
use brickx_authz::SigningKeyPair;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AuthServiceConfig::from_env_or_yaml().context("auth service config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: AuthServiceConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("brickx-authservice")?;
    let state = build_state(&config).await?;
    bootstrap::seed_admin(&state.auth, &config.bootstrap)
        .await
        .map_err(|err| anyhow::anyhow!("bootstrap admin: {err}"))?;

    let metrics_bind = config.metrics_bind;
    let metrics_task = tokio::spawn(async move {
        if let Err(err) = observability::serve_metrics(metrics_handle, metrics_bind).await {
            tracing::warn!(error = %err, %metrics_bind, "metrics listener stopped");
        }
    });

    let app = build_router(state);
    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "auth service listening");
    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await;

    metrics_task.abort();
    let _ = metrics_task.await;
    served?;
    tracing::info!("auth service stopped");
    Ok(())
}

async fn build_state(config: &AuthServiceConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn RbacStore + Send + Sync> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresStore::connect(pg).await?)
        }
    };
    if !store.is_durable() {
        tracing::warn!(
            backend = store.backend_name(),
            "rbac store is not durable; records are lost on restart"
        );
    }

    let key = load_signing_key(config)?;
    tracing::info!(kid = key.kid(), "signing key loaded");

    let external: Arc<dyn ExternalVerifier> = if config.exchange_issuers.is_empty() {
        Arc::new(DisabledExternalVerifier)
    } else {
        Arc::new(OidcExternalVerifier::with_issuers(
            config.exchange_issuers.clone(),
        ))
    };

    let settings = AuthSettings {
        issuer: config.issuer.clone(),
        audience: config.audience.clone(),
        token_ttl: config.token_ttl()?,
        leeway_seconds: config.leeway_seconds,
        default_role: config.default_role.clone(),
    };
    let auth = AuthService::new(store, key, external, settings);
    Ok(AppState::new(auth, config.auth_type))
}

fn load_signing_key(config: &AuthServiceConfig) -> anyhow::Result<SigningKeyPair> {
    match &config.private_key_path {
        Some(private_path) => {
            let key =
                SigningKeyPair::from_pem_files(private_path, config.public_key_path.as_deref())
                    .with_context(|| format!("load signing key {}", private_path.display()))?;
            key.validate().context("validate signing key")?;
            Ok(key)
        }
        None => {
            tracing::warn!(
                "no private key configured; using an ephemeral signing key, issued credentials will not survive a restart"
            );
            Ok(SigningKeyPair::generate())
        }
    }
}
