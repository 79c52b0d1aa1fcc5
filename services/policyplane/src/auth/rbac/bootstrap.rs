//! Default policy seeding.
//!
//! # Purpose
//! Seeds the objects a fresh policy plane needs to be administrable: the
//! `cluster-admin` and `view` ClusterRoles and a binding granting
//! `cluster-admin` to the superuser group. Writes go straight to the store;
//! existing objects are left untouched so restarts do not clobber edits.
use crate::store::{ObjectStore, RbacStores, StoreError};
use warden_rbac::{
    ClusterRole, ClusterRoleBinding, ObjectMeta, PolicyRule, RbacObject, RoleRef, Subject,
    VERB_ALL,
};

pub const CLUSTER_ADMIN: &str = "cluster-admin";
pub const VIEW: &str = "view";

pub fn default_cluster_roles() -> Vec<ClusterRole> {
    vec![
        ClusterRole {
            metadata: ObjectMeta::cluster(CLUSTER_ADMIN),
            rules: vec![
                PolicyRule::resource(&[VERB_ALL], &[VERB_ALL], &[VERB_ALL]),
                PolicyRule::non_resource(&[VERB_ALL], &[VERB_ALL]),
            ],
        },
        ClusterRole {
            metadata: ObjectMeta::cluster(VIEW),
            rules: vec![PolicyRule::resource(
                &["get", "list", "watch"],
                &[VERB_ALL],
                &[VERB_ALL],
            )],
        },
    ]
}

pub fn default_cluster_role_bindings(superuser_group: &str) -> Vec<ClusterRoleBinding> {
    vec![ClusterRoleBinding {
        metadata: ObjectMeta::cluster(CLUSTER_ADMIN),
        subjects: vec![Subject::group(superuser_group)],
        role_ref: RoleRef::cluster_role(CLUSTER_ADMIN),
    }]
}

/// Seed the default policy; returns how many objects were created.
pub async fn seed_default_policy(
    stores: &RbacStores,
    superuser_group: &str,
) -> Result<usize, StoreError> {
    let mut created = 0;
    for role in default_cluster_roles() {
        created += seed_one(stores.cluster_roles.as_ref(), role).await?;
    }
    for binding in default_cluster_role_bindings(superuser_group) {
        created += seed_one(stores.cluster_role_bindings.as_ref(), binding).await?;
    }
    tracing::info!(created, superuser_group, "default rbac policy seeded");
    Ok(created)
}

async fn seed_one<T: RbacObject>(store: &dyn ObjectStore<T>, object: T) -> Result<usize, StoreError> {
    let name = object.metadata().name.clone();
    match store.create(object).await {
        Ok(_) => Ok(1),
        Err(StoreError::Conflict(_)) => {
            tracing::debug!(kind = %T::KIND, name = %name, "default object already present");
            Ok(0)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ObjectKey, StoreConfig};
    use warden_rbac::{covers, validate_object};

    fn stores() -> RbacStores {
        RbacStores::in_memory(StoreConfig {
            changes_limit: 100,
            change_retention_max_rows: None,
        })
    }

    #[test]
    fn defaults_are_valid() {
        for role in default_cluster_roles() {
            validate_object(&role).expect("valid role");
        }
        for binding in default_cluster_role_bindings("system:masters") {
            validate_object(&binding).expect("valid binding");
        }
    }

    #[test]
    fn cluster_admin_covers_view() {
        let roles = default_cluster_roles();
        for rule in &roles[1].rules {
            assert!(covers(rule, &roles[0].rules), "{rule}");
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let stores = stores();
        assert_eq!(
            seed_default_policy(&stores, "system:masters").await.expect("seed"),
            3
        );
        assert_eq!(
            seed_default_policy(&stores, "system:masters").await.expect("reseed"),
            0
        );
        let binding = stores
            .cluster_role_bindings
            .get(&ObjectKey::cluster(CLUSTER_ADMIN))
            .await
            .expect("binding");
        assert_eq!(binding.subjects, vec![Subject::group("system:masters")]);
    }
}
