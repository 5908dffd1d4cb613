//! Namespaced CRUD over `Permission` resources.
//!
//! Implementations forward every call exactly once and surface the cluster's
//! error kind unchanged; retry policy lives in the orchestrator.

use crate::crd::Permission;
use crate::error::PermissionResult;
use async_trait::async_trait;

pub mod cluster;
pub mod memory;

pub use cluster::KubeAccessor;
pub use memory::InMemoryAccessor;

/// Outcome of a lookup that distinguishes absence from failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Permission),
    NotFound,
}

#[async_trait]
pub trait PermissionAccessor: Send + Sync {
    async fn list(&self, namespace: &str) -> PermissionResult<Vec<Permission>>;
    async fn get(&self, namespace: &str, name: &str) -> PermissionResult<Permission>;
    async fn create(&self, namespace: &str, resource: &Permission) -> PermissionResult<()>;
    /// Sends only the fields where `resource` differs from `baseline`.
    async fn patch(
        &self,
        namespace: &str,
        resource: &Permission,
        baseline: &Permission,
    ) -> PermissionResult<()>;
    async fn delete(&self, namespace: &str, name: &str) -> PermissionResult<()>;

    async fn lookup(&self, namespace: &str, name: &str) -> PermissionResult<Lookup> {
        match self.get(namespace, name).await {
            Ok(permission) => Ok(Lookup::Found(permission)),
            Err(err) if err.is_not_found() => Ok(Lookup::NotFound),
            Err(err) => Err(err),
        }
    }

    fn backend_name(&self) -> &'static str;
}
