use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_CLUSTER_REF: &str = "rabbitmqcluster-sample";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

// Resolved once at startup; nothing re-reads the environment per request.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub namespace: String,
    pub cluster_ref: String,
    pub kubeconfig: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind =
            lookup("RMQ_PERMISSIONS_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr: SocketAddr = bind.parse().context("invalid RMQ_PERMISSIONS_BIND value")?;

        let namespace = lookup("RMQ_PERMISSIONS_NAMESPACE")
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        if namespace.trim().is_empty() {
            bail!("RMQ_PERMISSIONS_NAMESPACE must not be empty");
        }

        let cluster_ref = lookup("RMQ_PERMISSIONS_CLUSTER_REF")
            .unwrap_or_else(|| DEFAULT_CLUSTER_REF.to_string());
        if cluster_ref.trim().is_empty() {
            bail!("RMQ_PERMISSIONS_CLUSTER_REF must not be empty");
        }

        let kubeconfig = lookup("RMQ_PERMISSIONS_KUBECONFIG")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let request_timeout = match lookup("RMQ_PERMISSIONS_REQUEST_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .context("invalid RMQ_PERMISSIONS_REQUEST_TIMEOUT_SECS value")?,
            None => DEFAULT_REQUEST_TIMEOUT_SECONDS,
        };

        Ok(Self {
            bind_addr,
            namespace: namespace.trim().to_string(),
            cluster_ref: cluster_ref.trim().to_string(),
            kubeconfig,
            request_timeout: Duration::from_secs(request_timeout),
        })
    }
}
