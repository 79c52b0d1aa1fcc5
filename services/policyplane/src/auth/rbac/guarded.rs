//! Store wrapper that admits writes only through validation and the
//! escalation guard.
//!
//! # Purpose
//! `create` and `update` run admission (scope, shape, roleRef immutability)
//! and then [`EscalationGuard::check`] against the full object before
//! anything reaches the underlying store. Reads, deletes, and the change feed
//! pass straight through.
//!
//! # Concurrency
//! `update` is read, mutate, check, then a conditional write against the
//! pre-image's `resource_version`. A concurrent writer makes it fail with
//! [`GuardError::Conflict`]; callers re-read and retry.
use crate::auth::context::RequestContext;
use crate::auth::rbac::error::GuardError;
use crate::auth::rbac::escalation::EscalationGuard;
use crate::store::{Change, ChangeSet, ObjectKey, ObjectStore, Snapshot};
use std::sync::Arc;
use warden_rbac::{Grant, RbacObject, RoleRef, validate_object, validate_role_ref_unchanged};

pub struct GuardedStore<T> {
    inner: Arc<dyn ObjectStore<T>>,
    guard: EscalationGuard,
}

impl<T> Clone for GuardedStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<T> GuardedStore<T>
where
    T: RbacObject + Clone + Send + Sync + 'static,
{
    pub fn new(inner: Arc<dyn ObjectStore<T>>, guard: EscalationGuard) -> Self {
        Self { inner, guard }
    }

    pub async fn create(&self, ctx: &RequestContext, mut object: T) -> Result<T, GuardError> {
        admit_scope(ctx, &mut object)?;
        validate_object(&object)?;
        self.guard.check(ctx, &object).await?;
        object.metadata_mut().resource_version = 0;
        let created = self.inner.create(object).await?;
        tracing::info!(
            user = %ctx.user().name,
            kind = %T::KIND,
            key = %ObjectKey::of(&created),
            "created rbac object"
        );
        Ok(created)
    }

    /// Apply `mutate` to the stored object and write the result.
    ///
    /// The mutator may set `resource_version` on its result as an extra
    /// precondition; zero means "whatever was read".
    pub async fn update<F>(
        &self,
        ctx: &RequestContext,
        key: &ObjectKey,
        mutate: F,
    ) -> Result<T, GuardError>
    where
        F: FnOnce(T) -> Result<T, GuardError> + Send,
    {
        let current = self.inner.get(key).await?;
        let read_version = current.metadata().resource_version;
        let previous_role_ref = role_ref_of(&current);

        let mut next = mutate(current)?;
        if ObjectKey::of(&next) != *key {
            return Err(GuardError::BadRequest(format!(
                "name and namespace of {} {key} cannot change",
                T::KIND
            )));
        }
        let requested = next.metadata().resource_version;
        if requested != 0 && requested != read_version {
            return Err(GuardError::Conflict(format!(
                "{} {key} was modified (resourceVersion {read_version}, request {requested})",
                T::KIND
            )));
        }
        validate_object(&next)?;
        if let (Some(previous), Some(updated)) = (previous_role_ref, role_ref_of(&next)) {
            validate_role_ref_unchanged(&previous, &updated)?;
        }
        self.guard.check(ctx, &next).await?;

        next.metadata_mut().resource_version = read_version;
        let updated = self.inner.update(next).await?;
        tracing::info!(
            user = %ctx.user().name,
            kind = %T::KIND,
            key = %key,
            resource_version = updated.metadata().resource_version,
            "updated rbac object"
        );
        Ok(updated)
    }

    pub async fn get(&self, key: &ObjectKey) -> Result<T, GuardError> {
        Ok(self.inner.get(key).await?)
    }

    pub async fn list(&self, namespace: Option<&str>) -> Result<Vec<T>, GuardError> {
        Ok(self.inner.list(namespace).await?)
    }

    pub async fn delete(&self, ctx: &RequestContext, key: &ObjectKey) -> Result<(), GuardError> {
        self.inner.delete(key).await?;
        tracing::info!(
            user = %ctx.user().name,
            kind = %T::KIND,
            key = %key,
            "deleted rbac object"
        );
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<Snapshot<T>, GuardError> {
        Ok(self.inner.snapshot().await?)
    }

    pub async fn changes(&self, since: u64) -> Result<ChangeSet<Change<T>>, GuardError> {
        Ok(self.inner.changes(since).await?)
    }
}

/// Default a namespaced object into the request namespace and reject
/// mismatches.
fn admit_scope<T: RbacObject>(ctx: &RequestContext, object: &mut T) -> Result<(), GuardError> {
    if !T::KIND.namespaced() {
        return Ok(());
    }
    let requested = ctx.namespace();
    let meta = object.metadata_mut();
    let declared = meta.namespace.clone().filter(|ns| !ns.is_empty());
    match (declared.as_deref(), requested) {
        (None, Some(namespace)) => {
            meta.namespace = Some(namespace.to_string());
            Ok(())
        }
        (None, None) => Err(GuardError::BadRequest(format!(
            "{} {} requires a namespace",
            T::KIND,
            meta.name
        ))),
        (Some(object_ns), Some(namespace)) if object_ns != namespace => {
            Err(GuardError::BadRequest(format!(
                "namespace {object_ns:?} does not match request namespace {namespace:?}"
            )))
        }
        _ => Ok(()),
    }
}

fn role_ref_of<T: RbacObject>(object: &T) -> Option<RoleRef> {
    match object.grant() {
        Grant::RoleRef { role_ref, .. } => Some(role_ref.clone()),
        Grant::Rules(_) => None,
    }
}
