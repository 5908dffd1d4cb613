pub mod accessor;
pub mod crd;
pub mod error;
pub mod mapper;
pub mod model;
pub mod patch;
pub mod service;

pub use accessor::{InMemoryAccessor, KubeAccessor, Lookup, PermissionAccessor};
pub use crd::{Permission, PermissionSpec, RabbitmqClusterReference, VhostPermissions};
pub use error::{PermissionError, PermissionResult};
pub use mapper::{permission_name, ResourceMapper};
pub use model::{Access, PermissionRecord};
pub use service::{PermissionService, UpsertOutcome};

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub backend: &'static str,
}

impl BuildInfo {
    pub const fn new(service: &'static str, version: &'static str, backend: &'static str) -> Self {
        Self { service, version, backend }
    }
}
