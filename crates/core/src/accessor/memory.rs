use super::PermissionAccessor;
use crate::crd::Permission;
use crate::error::{PermissionError, PermissionResult};
use crate::patch::{apply_merge_patch, merge_diff};
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Process-local stand-in for the API server, keyed by namespace then name.
#[derive(Debug, Default)]
pub struct InMemoryAccessor {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    namespaces: BTreeMap<String, BTreeMap<String, Permission>>,
    resource_version: u64,
}

impl MemoryState {
    fn next_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }
}

impl InMemoryAccessor {
    pub fn new() -> Self {
        Self::default()
    }
}

fn required_name(resource: &Permission) -> PermissionResult<String> {
    resource
        .metadata
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| PermissionError::Rejected("metadata.name is required".to_string()))
}

fn not_found(namespace: &str, name: &str) -> PermissionError {
    PermissionError::NotFound(format!("permissions.rabbitmq.com \"{name}\" in {namespace}"))
}

#[async_trait]
impl PermissionAccessor for InMemoryAccessor {
    async fn list(&self, namespace: &str) -> PermissionResult<Vec<Permission>> {
        let state = self.state.lock().await;
        Ok(state
            .namespaces
            .get(namespace)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, namespace: &str, name: &str) -> PermissionResult<Permission> {
        let state = self.state.lock().await;
        state
            .namespaces
            .get(namespace)
            .and_then(|items| items.get(name))
            .cloned()
            .ok_or_else(|| not_found(namespace, name))
    }

    async fn create(&self, namespace: &str, resource: &Permission) -> PermissionResult<()> {
        let name = required_name(resource)?;
        let mut state = self.state.lock().await;
        if state.namespaces.get(namespace).is_some_and(|items| items.contains_key(&name)) {
            return Err(PermissionError::AlreadyExists(format!(
                "permissions.rabbitmq.com \"{name}\" already exists"
            )));
        }

        let version = state.next_version();
        let items = state.namespaces.entry(namespace.to_string()).or_default();
        let mut stored = resource.clone();
        stored.metadata.namespace = Some(namespace.to_string());
        stored.metadata.uid = Some(format!("mem-{version}"));
        stored.metadata.resource_version = Some(version);
        stored.metadata.generation = Some(1);
        items.insert(name, stored);
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
            return Ok(());
        };

        let mut state = self.state.lock().await;
        let current = state
            .namespaces
            .get(namespace)
            .and_then(|items| items.get(&name))
            .ok_or_else(|| not_found(namespace, &name))?;

        let mut document = serde_json::to_value(current)?;
        apply_merge_patch(&mut document, &diff);
        let mut updated: Permission = serde_json::from_value(document)?;

        if updated.spec != current.spec {
            updated.metadata.generation = Some(current.metadata.generation.unwrap_or(0) + 1);
        }
        updated.metadata.resource_version = Some(state.next_version());
        if let Some(items) = state.namespaces.get_mut(namespace) {
            items.insert(name, updated);
        }
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> PermissionResult<()> {
        let mut state = self.state.lock().await;
        state
            .namespaces
            .get_mut(namespace)
            .and_then(|items| items.remove(name))
            .map(|_| ())
            .ok_or_else(|| not_found(namespace, name))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
