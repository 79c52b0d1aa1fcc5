//! Policy-plane HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage, default policy, and the HTTP router, then
//! serves the API and the metrics listener until shutdown.
use anyhow::Context;
use policyplane::app::{AppState, build_router};
use policyplane::auth::rbac::bootstrap::seed_default_policy;
use policyplane::config::PolicyPlaneConfig;
use policyplane::observability;
use policyplane::store::{RbacStores, StoreConfig};
use std::future::Future;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PolicyPlaneConfig::from_env_or_yaml().context("policy plane config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: PolicyPlaneConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("policyplane")?;
    let state = build_state(&config).await?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, metrics = %config.metrics_bind, "policy plane listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {
            tracing::info!("shutdown requested");
        }
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

async fn build_state(config: &PolicyPlaneConfig) -> anyhow::Result<AppState> {
    let stores = RbacStores::in_memory(StoreConfig {
        changes_limit: config.changes_limit,
        change_retention_max_rows: config.change_retention_max_rows,
    });
    if config.bootstrap_policy {
        seed_default_policy(&stores, &config.superuser_group)
            .await
            .context("seed default rbac policy")?;
    }
    Ok(AppState::with_rbac_authorizer(
        stores,
        config.authorizer_timeout,
        config.superuser_group.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> PolicyPlaneConfig {
        PolicyPlaneConfig {
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            metrics_bind: "127.0.0.1:0".parse().expect("addr"),
            authorizer_timeout: Duration::from_millis(500),
            superuser_group: "system:masters".to_string(),
            changes_limit: 100,
            change_retention_max_rows: None,
            bootstrap_policy: true,
        }
    }

    #[tokio::test]
    async fn build_state_seeds_default_policy() {
        let state = build_state(&test_config()).await.expect("state");
        let roles = state.cluster_roles.list(None).await.expect("list");
        let names: Vec<&str> = roles.iter().map(|role| role.metadata.name.as_str()).collect();
        assert_eq!(names, vec!["cluster-admin", "view"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_with_shutdown_stops_on_signal() {
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            run_with_shutdown(test_config(), async {}),
        )
        .await
        .expect("shutdown in time");
        result.expect("clean shutdown");
    }
}
