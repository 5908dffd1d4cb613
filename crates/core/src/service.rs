use crate::accessor::{Lookup, PermissionAccessor};
use crate::crd::Permission;
use crate::error::{PermissionError, PermissionResult};
use crate::mapper::{
    access_of, describe, permission_name, record_from_resource, with_access, ResourceMapper,
};
use crate::model::{validate_identity, PermissionRecord};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

impl UpsertOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
            UpsertOutcome::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upsert/delete orchestration over a shared [`PermissionAccessor`].
///
/// Holds no state of its own between calls; every operation re-reads the
/// cluster.
#[derive(Clone)]
pub struct PermissionService {
    accessor: Arc<dyn PermissionAccessor>,
    mapper: ResourceMapper,
}

impl PermissionService {
    pub fn new(accessor: Arc<dyn PermissionAccessor>, mapper: ResourceMapper) -> Self {
        Self { accessor, mapper }
    }

    pub fn backend_name(&self) -> &'static str {
        self.accessor.backend_name()
    }

    pub async fn list(&self, namespace: &str) -> PermissionResult<Vec<Permission>> {
        self.accessor.list(namespace).await
    }

    pub async fn get(
        &self,
        namespace: &str,
        user: &str,
        vhost: &str,
    ) -> PermissionResult<Permission> {
        validate_identity(user, vhost)?;
        let permission = self.accessor.get(namespace, &permission_name(user, vhost)).await?;
        if owner_mismatch(&permission, user, vhost).is_some() {
            return Err(PermissionError::NotFound(format!(
                "no permission for user {user} on vhost {vhost} in {namespace}"
            )));
        }
        Ok(permission)
    }

    pub async fn upsert(
        &self,
        namespace: &str,
        record: &PermissionRecord,
    ) -> PermissionResult<UpsertOutcome> {
        record.validate()?;
        let name = permission_name(&record.user, &record.vhost);

        match self.accessor.lookup(namespace, &name).await? {
            Lookup::Found(existing) => self.patch_access(namespace, &existing, record).await,
            Lookup::NotFound => {
                let resource = self.mapper.to_resource(namespace, record);
                match self.accessor.create(namespace, &resource).await {
                    Ok(()) => {
                        info!(namespace, name = %name, "permission created");
                        Ok(UpsertOutcome::Created)
                    }
                    Err(err) if err.is_already_exists() => {
                        warn!(namespace, name = %name, "lost create race, patching instead");
                        match self.accessor.lookup(namespace, &name).await? {
                            Lookup::Found(existing) => {
                                self.patch_access(namespace, &existing, record).await
                            }
                            Lookup::NotFound => Err(err),
                        }
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    pub async fn delete(&self, namespace: &str, user: &str, vhost: &str) -> PermissionResult<()> {
        validate_identity(user, vhost)?;
        let name = permission_name(user, vhost);

        match self.accessor.lookup(namespace, &name).await? {
            Lookup::Found(existing) => {
                ensure_owner(&existing, user, vhost)?;
                self.accessor.delete(namespace, &name).await?;
                info!(namespace, name = %name, "permission deleted");
                Ok(())
            }
            Lookup::NotFound => Err(PermissionError::NotFound(format!(
                "no permission for user {user} on vhost {vhost} in {namespace}"
            ))),
        }
    }

    async fn patch_access(
        &self,
        namespace: &str,
        existing: &Permission,
        record: &PermissionRecord,
    ) -> PermissionResult<UpsertOutcome> {
        ensure_owner(existing, &record.user, &record.vhost)?;
        if access_of(existing) == record.access {
            debug!(namespace, user = %record.user, vhost = %record.vhost, "access unchanged");
            return Ok(UpsertOutcome::Unchanged);
        }

        let updated = with_access(existing, &record.access);
        self.accessor.patch(namespace, &updated, existing).await?;
        info!(namespace, user = %record.user, vhost = %record.vhost, "permission access patched");
        Ok(UpsertOutcome::Updated)
    }
}

/// Names are `<vhost>-<user>-permission`, so pairs such as `(orders-svc, prod)`
/// and `(svc, prod-orders)` share one. Returns the pair that actually owns
/// `permission` when it is not the requested one.
fn owner_mismatch(permission: &Permission, user: &str, vhost: &str) -> Option<PermissionRecord> {
    let owner = record_from_resource(permission);
    (owner.user != user || owner.vhost != vhost).then_some(owner)
}

fn ensure_owner(permission: &Permission, user: &str, vhost: &str) -> PermissionResult<()> {
    match owner_mismatch(permission, user, vhost) {
        None => Ok(()),
        Some(owner) => {
            warn!(
                resource = %describe(permission),
                owner_user = %owner.user,
                owner_vhost = %owner.vhost,
                user,
                vhost,
                "resource name belongs to another user/vhost pair"
            );
            Err(PermissionError::Conflict(format!(
                "{} belongs to user {} on vhost {}, not user {user} on vhost {vhost}",
                describe(permission),
                owner.user,
                owner.vhost
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::InMemoryAccessor;
    use crate::model::Access;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NS: &str = "default";

    fn service_with(accessor: Arc<dyn PermissionAccessor>) -> PermissionService {
        PermissionService::new(accessor, ResourceMapper::new("rabbitmqcluster-sample"))
    }

    fn record(user: &str, vhost: &str, access: Access) -> PermissionRecord {
        PermissionRecord::new(user, vhost, access)
    }

    /// Accessor whose lookups always fail at the transport level.
    struct UnreachableAccessor {
        creates: AtomicUsize,
    }

    #[async_trait]
    impl PermissionAccessor for UnreachableAccessor {
        async fn list(&self, _namespace: &str) -> PermissionResult<Vec<Permission>> {
            Err(PermissionError::ClusterUnavailable("connection refused".to_string()))
        }

        async fn get(&self, _namespace: &str, _name: &str) -> PermissionResult<Permission> {
            Err(PermissionError::ClusterUnavailable("connection refused".to_string()))
        }

        async fn create(&self, _namespace: &str, _resource: &Permission) -> PermissionResult<()> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn patch(
            &self,
            _namespace: &str,
            _resource: &Permission,
            _baseline: &Permission,
        ) -> PermissionResult<()> {
            Ok(())
        }

        async fn delete(&self, _namespace: &str, _name: &str) -> PermissionResult<()> {
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "unreachable"
        }
    }

    /// Lets a competing writer create the resource between our lookup and
    /// our create.
    struct RacingAccessor {
        inner: InMemoryAccessor,
        competitor: Permission,
    }

    #[async_trait]
    impl PermissionAccessor for RacingAccessor {
        async fn list(&self, namespace: &str) -> PermissionResult<Vec<Permission>> {
            self.inner.list(namespace).await
        }

        async fn get(&self, namespace: &str, name: &str) -> PermissionResult<Permission> {
            self.inner.get(namespace, name).await
        }

        async fn create(&self, namespace: &str, resource: &Permission) -> PermissionResult<()> {
            self.inner.create(namespace, &self.competitor).await?;
            self.inner.create(namespace, resource).await
        }

        async fn patch(
            &self,
            namespace: &str,
            resource: &Permission,
            baseline: &Permission,
        ) -> PermissionResult<()> {
            self.inner.patch(namespace, resource, baseline).await
        }

        async fn delete(&self, namespace: &str, name: &str) -> PermissionResult<()> {
            self.inner.delete(namespace, name).await
        }

        fn backend_name(&self) -> &'static str {
            "racing"
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_reports_unchanged() {
        let accessor = Arc::new(InMemoryAccessor::new());
        let service = service_with(accessor.clone());
        let grant = record("daryl", "test", Access::new(".*", ".*", ".*"));

        assert_eq!(service.upsert(NS, &grant).await.unwrap(), UpsertOutcome::Created);
        let first = accessor.get(NS, "test-daryl-permission").await.unwrap();

        assert_eq!(service.upsert(NS, &grant).await.unwrap(), UpsertOutcome::Unchanged);
        let second = accessor.get(NS, "test-daryl-permission").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(accessor.list(NS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_patches_access_in_place() {
        let accessor = Arc::new(InMemoryAccessor::new());
        let service = service_with(accessor.clone());

        service.upsert(NS, &record("daryl", "test", Access::new(".*", "*.", "/*"))).await.unwrap();
        let outcome =
            service.upsert(NS, &record("daryl", "test", Access::new("*", "*", "*"))).await.unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated);
        let stored = service.get(NS, "daryl", "test").await.unwrap();
        assert_eq!(access_of(&stored), Access::new("*", "*", "*"));
        assert_eq!(stored.spec.rabbitmq_cluster_reference.name, "rabbitmqcluster-sample");
        assert_eq!(accessor.list(NS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn distinct_vhosts_are_distinct_resources() {
        let service = service_with(Arc::new(InMemoryAccessor::new()));
        let access = Access::new("*", "*", "*");

        service.upsert(NS, &record("daryl", "test", access.clone())).await.unwrap();
        service.upsert(NS, &record("daryl", "test2", access)).await.unwrap();

        assert_eq!(service.list(NS).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn transport_failure_never_falls_through_to_create() {
        let accessor = Arc::new(UnreachableAccessor { creates: AtomicUsize::new(0) });
        let service = service_with(accessor.clone());

        let err = service
            .upsert(NS, &record("daryl", "test", Access::new("*", "*", "*")))
            .await
            .unwrap_err();

        assert!(matches!(err, PermissionError::ClusterUnavailable(_)));
        assert_eq!(accessor.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn lost_create_race_is_reconciled_into_a_patch() {
        let mapper = ResourceMapper::new("rabbitmqcluster-sample");
        let competitor =
            mapper.to_resource(NS, &record("daryl", "test", Access::new("*", "*", "*")));
        let accessor = Arc::new(RacingAccessor { inner: InMemoryAccessor::new(), competitor });
        let service = PermissionService::new(accessor.clone(), mapper);

        let outcome =
            service.upsert(NS, &record("daryl", "test", Access::new(".*", "", ""))).await.unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated);
        let stored = accessor.get(NS, "test-daryl-permission").await.unwrap();
        assert_eq!(access_of(&stored), Access::new(".*", "", ""));
    }

    #[tokio::test]
    async fn delete_missing_pair_is_not_found_and_leaves_state() {
        let service = service_with(Arc::new(InMemoryAccessor::new()));
        service.upsert(NS, &record("jerry", "test", Access::new("*", "*", "*"))).await.unwrap();

        let err = service.delete(NS, "daryl", "test").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(service.list(NS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn colliding_pair_cannot_touch_another_grant() {
        let accessor = Arc::new(InMemoryAccessor::new());
        let service = service_with(accessor.clone());
        let grant = record("orders-svc", "prod", Access::new("a", "a", "a"));
        service.upsert(NS, &grant).await.unwrap();

        let err = service
            .upsert(NS, &record("svc", "prod-orders", Access::new("b", "b", "b")))
            .await
            .unwrap_err();
        assert!(matches!(err, PermissionError::Conflict(_)));

        let err = service.delete(NS, "svc", "prod-orders").await.unwrap_err();
        assert!(matches!(err, PermissionError::Conflict(_)));
        assert!(service.get(NS, "svc", "prod-orders").await.unwrap_err().is_not_found());

        let stored = accessor.get(NS, "prod-orders-svc-permission").await.unwrap();
        assert_eq!(stored.spec.user.as_deref(), Some("orders-svc"));
        assert_eq!(access_of(&stored), Access::new("a", "a", "a"));
        assert_eq!(accessor.list(NS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_identity_is_rejected_before_any_call() {
        let accessor = Arc::new(UnreachableAccessor { creates: AtomicUsize::new(0) });
        let service = service_with(accessor);

        let err = service.upsert(NS, &record("", "test", Access::default())).await.unwrap_err();
        assert!(matches!(err, PermissionError::InvalidRecord(_)));

        let err = service.delete(NS, "daryl", "").await.unwrap_err();
        assert!(matches!(err, PermissionError::InvalidRecord(_)));
    }
}
