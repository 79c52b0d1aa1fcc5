//! Object storage contract for RBAC objects.
//!
//! # Purpose
//! Defines the CRUD + change-feed contract the policy plane consumes for the
//! four RBAC kinds, plus the bundle of per-kind stores handed to the rule
//! resolver and the guarded API surface.
//!
//! # Notes
//! `update` is a conditional write: a non-zero `resource_version` on the
//! incoming object must equal the stored one. Watchers consume `changes(since)`
//! and fall back to `snapshot()` when they fall behind the retention window.
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use warden_rbac::{ClusterRole, ClusterRoleBinding, RbacObject, Role, RoleBinding};

pub mod memory;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub changes_limit: u64,
    pub change_retention_max_rows: Option<i64>,
}

impl StoreConfig {
    pub fn change_window(&self) -> usize {
        self.change_retention_max_rows
            .unwrap_or(self.changes_limit as i64)
            .max(self.changes_limit as i64) as usize
    }
}

/// Store key: optional namespace plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectKey {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn of<T: RbacObject>(object: &T) -> Self {
        let meta = object.metadata();
        Self {
            namespace: meta.namespace.clone(),
            name: meta.name.clone(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub next_seq: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeSet<T> {
    pub items: Vec<T>,
    pub next_seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeOp {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Serialize)]
pub struct Change<T> {
    pub seq: u64,
    pub op: ChangeOp,
    pub key: ObjectKey,
    pub object: Option<T>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ObjectStore<T>: Send + Sync {
    async fn create(&self, object: T) -> StoreResult<T>;
    async fn get(&self, key: &ObjectKey) -> StoreResult<T>;
    /// List objects, restricted to `namespace` when given.
    async fn list(&self, namespace: Option<&str>) -> StoreResult<Vec<T>>;
    async fn update(&self, object: T) -> StoreResult<T>;
    async fn delete(&self, key: &ObjectKey) -> StoreResult<()>;
    async fn snapshot(&self) -> StoreResult<Snapshot<T>>;
    async fn changes(&self, since: u64) -> StoreResult<ChangeSet<Change<T>>>;

    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}

/// Per-kind stores backing the policy plane.
#[derive(Clone)]
pub struct RbacStores {
    pub roles: Arc<dyn ObjectStore<Role>>,
    pub cluster_roles: Arc<dyn ObjectStore<ClusterRole>>,
    pub role_bindings: Arc<dyn ObjectStore<RoleBinding>>,
    pub cluster_role_bindings: Arc<dyn ObjectStore<ClusterRoleBinding>>,
}

impl RbacStores {
    pub fn in_memory(config: StoreConfig) -> Self {
        Self {
            roles: Arc::new(memory::InMemoryStore::<Role>::new(config.clone())),
            cluster_roles: Arc::new(memory::InMemoryStore::<ClusterRole>::new(config.clone())),
            role_bindings: Arc::new(memory::InMemoryStore::<RoleBinding>::new(config.clone())),
            cluster_role_bindings: Arc::new(memory::InMemoryStore::<ClusterRoleBinding>::new(
                config,
            )),
        }
    }

    pub async fn health_check(&self) -> StoreResult<()> {
        self.roles.health_check().await?;
        self.cluster_roles.health_check().await?;
        self.role_bindings.health_check().await?;
        self.cluster_role_bindings.health_check().await
    }

    pub fn backend_name(&self) -> &'static str {
        self.roles.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_window_uses_larger_bound() {
        let config = StoreConfig {
            changes_limit: 10,
            change_retention_max_rows: Some(4),
        };
        assert_eq!(config.change_window(), 10);
        let config = StoreConfig {
            changes_limit: 10,
            change_retention_max_rows: None,
        };
        assert_eq!(config.change_window(), 10);
        let config = StoreConfig {
            changes_limit: 10,
            change_retention_max_rows: Some(50),
        };
        assert_eq!(config.change_window(), 50);
    }

    #[test]
    fn object_key_display() {
        assert_eq!(ObjectKey::cluster("view").to_string(), "view");
        assert_eq!(ObjectKey::namespaced("ns1", "r").to_string(), "ns1/r");
    }
}
