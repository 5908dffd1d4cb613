use anyhow::Context;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use rmq_permissions_api::{build_router, ApiConfig, AppState};
use rmq_permissions_core::{KubeAccessor, PermissionService, ResourceMapper};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ApiConfig::from_env()?;
    let client = kube_client(config.kubeconfig.as_deref()).await?;
    info!(
        namespace = %config.namespace,
        cluster_ref = %config.cluster_ref,
        "connected to kubernetes api server"
    );

    let service = PermissionService::new(
        Arc::new(KubeAccessor::new(client)),
        ResourceMapper::new(config.cluster_ref.clone()),
    );
    let state = AppState::new(service, config.namespace.clone());
    let app = build_router(state, config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "rmq permissions api booted");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("rmq permissions api server failed")
}

async fn kube_client(kubeconfig: Option<&Path>) -> anyhow::Result<Client> {
    let Some(path) = kubeconfig else {
        return Client::try_default().await.context("failed to create kubernetes client");
    };

    let kubeconfig = Kubeconfig::read_from(path)
        .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .context("failed to load kubeconfig")?;
    Client::try_from(config).context("failed to create kubernetes client")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_span_list(false)
        .init();
}
