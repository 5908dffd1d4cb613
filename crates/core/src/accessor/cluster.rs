use super::PermissionAccessor;
use crate::crd::Permission;
use crate::error::PermissionResult;
use crate::patch::merge_diff;
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::debug;

/// Accessor backed by the Kubernetes API server. Cloning shares the
/// underlying client connection pool.
#[derive(Clone)]
pub struct KubeAccessor {
    client: Client,
}

impl KubeAccessor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Permission> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl PermissionAccessor for KubeAccessor {
    async fn list(&self, namespace: &str) -> PermissionResult<Vec<Permission>> {
        let list = self.api(namespace).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn get(&self, namespace: &str, name: &str) -> PermissionResult<Permission> {
        Ok(self.api(namespace).get(name).await?)
    }

    async fn create(&self, namespace: &str, resource: &Permission) -> PermissionResult<()> {
        self.api(namespace).create(&PostParams::default(), resource).await?;
        Ok(())
    }

    async fn patch(
        &self,
        namespace: &str,
        resource: &Permission,
        baseline: &Permission,
    ) -> PermissionResult<()> {
        let name = resource.name_any();
        let Some(diff) =
            merge_diff(&serde_json::to_value(baseline)?, &serde_json::to_value(resource)?)
        else {
            debug!(namespace, name = %name, "merge patch is empty, skipping");
            return Ok(());
        };

        self.api(namespace).patch(&name, &PatchParams::default(), &Patch::Merge(&diff)).await?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> PermissionResult<()> {
        self.api(namespace).delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "kubernetes"
    }
}
