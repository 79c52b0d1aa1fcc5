//! In-memory implementation of the RBAC object store.
//!
//! # Purpose
//! Implements [`ObjectStore`] for any RBAC kind using a `HashMap` guarded by
//! `tokio::sync::RwLock`. It backs local development, tests, and deployments
//! where durability is not required.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: writes take the object map lock and then
//!   the change-log lock, always in that order.
//!
//! # Change streams
//! Each store keeps a bounded change log (`StoreConfig::change_window`). The
//! sequence number assigned to a change doubles as the object's
//! `resource_version` (offset by one so zero stays "unset").
use super::{
    Change, ChangeOp, ChangeSet, ObjectKey, ObjectStore, Snapshot, StoreConfig, StoreError,
    StoreResult,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use warden_rbac::RbacObject;

/// Bounded, in-memory append-only log of changes for one kind.
///
/// Consumers that poll slower than the retention window miss changes and must
/// re-bootstrap from `snapshot()`.
#[derive(Debug)]
struct ChangeLog<T> {
    next_seq: u64,
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> ChangeLog<T> {
    fn new(capacity: usize) -> Self {
        Self {
            next_seq: 0,
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    fn record(&mut self, item: impl FnOnce(u64) -> T) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(item(seq));
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
        seq
    }
}

/// In-memory store for a single RBAC kind.
pub struct InMemoryStore<T> {
    config: StoreConfig,
    /// Authoritative objects keyed by `(namespace, name)`.
    objects: Arc<RwLock<HashMap<ObjectKey, T>>>,
    /// Bounded change log; `next_seq` is per kind.
    changes: Arc<RwLock<ChangeLog<Change<T>>>>,
}

impl<T> InMemoryStore<T>
where
    T: RbacObject + Clone + Send + Sync + 'static,
{
    pub fn new(config: StoreConfig) -> Self {
        let capacity = config.change_window();
        Self {
            config,
            objects: Arc::new(RwLock::new(HashMap::new())),
            changes: Arc::new(RwLock::new(ChangeLog::new(capacity))),
        }
    }

    fn limit(&self) -> usize {
        self.config.changes_limit as usize
    }

    fn record_gauge(len: usize) {
        metrics::gauge!("policyplane_objects_total", "kind" => T::KIND.as_str()).set(len as f64);
    }

    /// Stamp the next resource version on `object` and append the change.
    async fn write_change(&self, op: ChangeOp, key: &ObjectKey, object: &mut T) {
        let mut changes = self.changes.write().await;
        object.metadata_mut().resource_version = changes.next_seq + 1;
        let recorded = object.clone();
        changes.record(|seq| Change {
            seq,
            op,
            key: key.clone(),
            object: Some(recorded),
        });
    }
}

#[async_trait]
impl<T> ObjectStore<T> for InMemoryStore<T>
where
    T: RbacObject + Clone + Send + Sync + 'static,
{
    async fn create(&self, mut object: T) -> StoreResult<T> {
        let key = ObjectKey::of(&object);
        let mut objects = self.objects.write().await;
        if objects.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{} {key} exists", T::KIND)));
        }
        self.write_change(ChangeOp::Created, &key, &mut object).await;
        objects.insert(key, object.clone());
        Self::record_gauge(objects.len());
        Ok(object)
    }

    async fn get(&self, key: &ObjectKey) -> StoreResult<T> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{} {key}", T::KIND)))
    }

    async fn list(&self, namespace: Option<&str>) -> StoreResult<Vec<T>> {
        let objects = self.objects.read().await;
        let mut matching: Vec<(&ObjectKey, &T)> = objects
            .iter()
            .filter(|(key, _)| namespace.is_none() || key.namespace.as_deref() == namespace)
            .collect();
        matching.sort_by(|(left, _), (right, _)| left.cmp(right));
        Ok(matching.into_iter().map(|(_, object)| object.clone()).collect())
    }

    async fn update(&self, mut object: T) -> StoreResult<T> {
        let key = ObjectKey::of(&object);
        let mut objects = self.objects.write().await;
        let current = objects
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(format!("{} {key}", T::KIND)))?;
        let expected = object.metadata().resource_version;
        let stored = current.metadata().resource_version;
        if expected != 0 && expected != stored {
            return Err(StoreError::Conflict(format!(
                "{} {key} was modified (resourceVersion {stored}, request {expected})",
                T::KIND
            )));
        }
        self.write_change(ChangeOp::Updated, &key, &mut object).await;
        objects.insert(key, object.clone());
        Ok(object)
    }

    async fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        let mut objects = self.objects.write().await;
        if objects.remove(key).is_none() {
            return Err(StoreError::NotFound(format!("{} {key}", T::KIND)));
        }
        self.changes.write().await.record(|seq| Change {
            seq,
            op: ChangeOp::Deleted,
            key: key.clone(),
            object: None,
        });
        Self::record_gauge(objects.len());
        Ok(())
    }

    async fn snapshot(&self) -> StoreResult<Snapshot<T>> {
        // Hold both locks so `next_seq` matches the items returned.
        let objects = self.objects.read().await;
        let changes = self.changes.read().await;
        let mut keys: Vec<&ObjectKey> = objects.keys().collect();
        keys.sort();
        Ok(Snapshot {
            items: keys.into_iter().filter_map(|key| objects.get(key).cloned()).collect(),
            next_seq: changes.next_seq,
        })
    }

    async fn changes(&self, since: u64) -> StoreResult<ChangeSet<Change<T>>> {
        let guard = self.changes.read().await;
        let limit = self.limit();
        let items: Vec<Change<T>> = guard
            .items
            .iter()
            .filter(|item| item.seq >= since)
            .take(limit)
            .cloned()
            .collect();
        // A full page resumes right after its last item, not at the log head.
        let next_seq = match items.last() {
            Some(last) if items.len() == limit => last.seq + 1,
            _ => guard.next_seq,
        };
        Ok(ChangeSet { items, next_seq })
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
