use crate::crd::{Permission, PermissionSpec, RabbitmqClusterReference, VhostPermissions};
use crate::model::{Access, PermissionRecord};
use kube::ResourceExt;

/// Canonical resource name for a user/vhost pair. The name is the only
/// uniqueness key, so it must stay deterministic.
pub fn permission_name(user: &str, vhost: &str) -> String {
    format!("{vhost}-{user}-permission")
}

/// Translates between [`PermissionRecord`]s and `Permission` resources bound to
/// one broker cluster.
#[derive(Debug, Clone)]
pub struct ResourceMapper {
    cluster_ref: String,
}

impl ResourceMapper {
    pub fn new(cluster_ref: impl Into<String>) -> Self {
        Self { cluster_ref: cluster_ref.into() }
    }

    pub fn cluster_ref(&self) -> &str {
        &self.cluster_ref
    }

    pub fn to_resource(&self, namespace: &str, record: &PermissionRecord) -> Permission {
        let mut permission = Permission::new(
            &permission_name(&record.user, &record.vhost),
            PermissionSpec {
                user: Some(record.user.clone()),
                user_reference: None,
                vhost: record.vhost.clone(),
                permissions: permissions_from_access(&record.access),
                rabbitmq_cluster_reference: RabbitmqClusterReference {
                    name: self.cluster_ref.clone(),
                    namespace: None,
                },
            },
        );
        permission.metadata.namespace = Some(namespace.to_string());
        permission
    }
}

/// Copy of `existing` with only the access triple replaced.
pub fn with_access(existing: &Permission, access: &Access) -> Permission {
    let mut updated = existing.clone();
    updated.spec.permissions = permissions_from_access(access);
    updated
}

pub fn access_of(permission: &Permission) -> Access {
    let permissions = &permission.spec.permissions;
    Access {
        read: permissions.read.clone(),
        write: permissions.write.clone(),
        configure: permissions.configure.clone(),
    }
}

pub fn record_from_resource(permission: &Permission) -> PermissionRecord {
    let user = permission
        .spec
        .user
        .clone()
        .or_else(|| permission.spec.user_reference.as_ref().map(|r| r.name.clone()))
        .unwrap_or_default();

    PermissionRecord { user, vhost: permission.spec.vhost.clone(), access: access_of(permission) }
}

pub fn describe(permission: &Permission) -> String {
    match permission.namespace() {
        Some(namespace) => format!("{namespace}/{}", permission.name_any()),
        None => permission.name_any(),
    }
}

fn permissions_from_access(access: &Access) -> VhostPermissions {
    VhostPermissions {
        configure: access.configure.clone(),
        write: access.write.clone(),
        read: access.read.clone(),
    }
}
