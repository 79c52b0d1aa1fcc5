//! Effective rule resolution for a user in a scope.
//!
//! # Purpose
//! Walks the bindings that name a user and collects the rules of the roles
//! they reference. Every decision does a fresh, request-scoped walk over a
//! [`RoleLookup`]; nothing is cached between requests.
//!
//! # Failure model
//! - A binding whose role no longer exists is skipped and recorded in
//!   [`ResolvedRules::errors`]; the remaining bindings still contribute.
//! - Any other lookup failure aborts resolution with [`ResolveError::Lookup`].
use crate::store::{ObjectKey, ObjectStore, RbacStores, StoreError, StoreResult};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use warden_rbac::{
    ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, RoleRefKind, Scope,
    Subject, UserInfo,
};

#[async_trait]
pub trait RoleLookup: Send + Sync {
    async fn get_role(&self, namespace: &str, name: &str) -> StoreResult<Role>;
    async fn get_cluster_role(&self, name: &str) -> StoreResult<ClusterRole>;
    async fn list_role_bindings(&self, namespace: &str) -> StoreResult<Vec<RoleBinding>>;
    async fn list_cluster_role_bindings(&self) -> StoreResult<Vec<ClusterRoleBinding>>;
}

#[async_trait]
impl RoleLookup for RbacStores {
    async fn get_role(&self, namespace: &str, name: &str) -> StoreResult<Role> {
        self.roles.get(&ObjectKey::namespaced(namespace, name)).await
    }

    async fn get_cluster_role(&self, name: &str) -> StoreResult<ClusterRole> {
        self.cluster_roles.get(&ObjectKey::cluster(name)).await
    }

    async fn list_role_bindings(&self, namespace: &str) -> StoreResult<Vec<RoleBinding>> {
        self.role_bindings.list(Some(namespace)).await
    }

    async fn list_cluster_role_bindings(&self) -> StoreResult<Vec<ClusterRoleBinding>> {
        self.cluster_role_bindings.list(None).await
    }
}

/// A binding that could not be resolved; recorded, not fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    pub binding: String,
    pub role_ref: RoleRef,
    pub reason: String,
}

impl std::fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}: {}", self.binding, self.role_ref, self.reason)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedRules {
    pub rules: Vec<PolicyRule>,
    pub errors: Vec<ResolutionError>,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    NamespaceRequired(String),
    #[error(transparent)]
    Lookup(StoreError),
}

#[derive(Clone)]
pub struct RuleResolver {
    lookup: Arc<dyn RoleLookup>,
}

impl RuleResolver {
    pub fn new(lookup: Arc<dyn RoleLookup>) -> Self {
        Self { lookup }
    }

    /// Rules granted to `user` in `scope`.
    ///
    /// Cluster-wide bindings always apply; namespace bindings apply only when
    /// `scope` is that namespace.
    pub async fn rules_for(
        &self,
        user: &UserInfo,
        scope: &Scope,
    ) -> Result<ResolvedRules, ResolveError> {
        let mut resolved = ResolvedRules::default();

        let cluster_bindings = self
            .lookup
            .list_cluster_role_bindings()
            .await
            .map_err(ResolveError::Lookup)?;
        for binding in cluster_bindings {
            if !names_user(&binding.subjects, user, None) {
                continue;
            }
            let binding_name = binding.metadata.name.clone();
            self.collect(&mut resolved, binding_name, None, &binding.role_ref)
                .await?;
        }

        if let Some(namespace) = scope.namespace() {
            let bindings = self
                .lookup
                .list_role_bindings(namespace)
                .await
                .map_err(ResolveError::Lookup)?;
            for binding in bindings {
                if !names_user(&binding.subjects, user, Some(namespace)) {
                    continue;
                }
                let binding_name = format!("{namespace}/{}", binding.metadata.name);
                self.collect(&mut resolved, binding_name, Some(namespace), &binding.role_ref)
                    .await?;
            }
        }

        if !resolved.errors.is_empty() {
            metrics::counter!("policyplane_resolution_errors_total")
                .increment(resolved.errors.len() as u64);
            for error in &resolved.errors {
                tracing::warn!(
                    user = %user.name,
                    scope = %scope,
                    binding = %error.binding,
                    role_ref = %error.role_ref,
                    error = %error.reason,
                    "skipping unresolvable binding"
                );
            }
        }
        Ok(resolved)
    }

    /// Rules of a single role reference, as seen from `namespace`.
    pub async fn rules_for_role_ref(
        &self,
        namespace: Option<&str>,
        role_ref: &RoleRef,
    ) -> Result<Vec<PolicyRule>, ResolveError> {
        let lookup = match role_ref.kind {
            RoleRefKind::ClusterRole => self
                .lookup
                .get_cluster_role(&role_ref.name)
                .await
                .map(|role| role.rules),
            RoleRefKind::Role => {
                let Some(namespace) = namespace else {
                    return Err(ResolveError::NamespaceRequired(format!(
                        "{role_ref} can only be resolved inside a namespace"
                    )));
                };
                self.lookup
                    .get_role(namespace, &role_ref.name)
                    .await
                    .map(|role| role.rules)
            }
        };
        match lookup {
            Ok(rules) => Ok(rules),
            Err(StoreError::NotFound(_)) => {
                Err(ResolveError::NotFound(format!("{role_ref} not found")))
            }
            Err(err) => Err(ResolveError::Lookup(err)),
        }
    }

    async fn collect(
        &self,
        resolved: &mut ResolvedRules,
        binding: String,
        namespace: Option<&str>,
        role_ref: &RoleRef,
    ) -> Result<(), ResolveError> {
        match self.rules_for_role_ref(namespace, role_ref).await {
            Ok(rules) => resolved.rules.extend(rules),
            Err(ResolveError::Lookup(err)) => return Err(ResolveError::Lookup(err)),
            Err(err) => resolved.errors.push(ResolutionError {
                binding,
                role_ref: role_ref.clone(),
                reason: err.to_string(),
            }),
        }
        Ok(())
    }
}

fn names_user(subjects: &[Subject], user: &UserInfo, binding_namespace: Option<&str>) -> bool {
    subjects
        .iter()
        .any(|subject| subject.applies_to(user, binding_namespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use warden_rbac::ObjectMeta;

    fn stores() -> RbacStores {
        RbacStores::in_memory(StoreConfig {
            changes_limit: 100,
            change_retention_max_rows: None,
        })
    }

    fn pods(verbs: &[&str]) -> PolicyRule {
        PolicyRule::resource(verbs, &[""], &["pods"])
    }

    async fn seed(stores: &RbacStores) {
        stores
            .roles
            .create(Role {
                metadata: ObjectMeta::namespaced("ns1", "pod-reader"),
                rules: vec![pods(&["get", "list"])],
            })
            .await
            .expect("role");
        stores
            .cluster_roles
            .create(ClusterRole {
                metadata: ObjectMeta::cluster("pod-deleter"),
                rules: vec![pods(&["delete"])],
            })
            .await
            .expect("cluster role");
        stores
            .role_bindings
            .create(RoleBinding {
                metadata: ObjectMeta::namespaced("ns1", "alice-reader"),
                subjects: vec![Subject::user("alice")],
                role_ref: RoleRef::role("pod-reader"),
            })
            .await
            .expect("binding");
        stores
            .cluster_role_bindings
            .create(ClusterRoleBinding {
                metadata: ObjectMeta::cluster("devs-delete"),
                subjects: vec![Subject::group("devs")],
                role_ref: RoleRef::cluster_role("pod-deleter"),
            })
            .await
            .expect("cluster binding");
    }

    #[tokio::test]
    async fn collects_cluster_and_namespace_rules() {
        let stores = stores();
        seed(&stores).await;
        let resolver = RuleResolver::new(Arc::new(stores));
        let alice = UserInfo::new("alice").with_groups(&["devs"]);

        let resolved = resolver
            .rules_for(&alice, &Scope::in_namespace("ns1"))
            .await
            .expect("resolve");
        assert_eq!(resolved.rules.len(), 2);
        assert!(resolved.errors.is_empty());

        let cluster = resolver
            .rules_for(&alice, &Scope::Cluster)
            .await
            .expect("resolve");
        assert_eq!(cluster.rules, vec![pods(&["delete"])]);

        let other_ns = resolver
            .rules_for(&alice, &Scope::in_namespace("ns2"))
            .await
            .expect("resolve");
        assert_eq!(other_ns.rules, vec![pods(&["delete"])]);
    }

    #[tokio::test]
    async fn missing_role_is_recorded_not_fatal() {
        let stores = stores();
        seed(&stores).await;
        stores
            .role_bindings
            .create(RoleBinding {
                metadata: ObjectMeta::namespaced("ns1", "stale"),
                subjects: vec![Subject::user("alice")],
                role_ref: RoleRef::role("deleted-role"),
            })
            .await
            .expect("stale binding");
        let resolver = RuleResolver::new(Arc::new(stores));

        let resolved = resolver
            .rules_for(&UserInfo::new("alice"), &Scope::in_namespace("ns1"))
            .await
            .expect("resolve");
        assert_eq!(resolved.rules, vec![pods(&["get", "list"])]);
        assert_eq!(resolved.errors.len(), 1);
        assert_eq!(resolved.errors[0].binding, "ns1/stale");
        assert_eq!(resolved.errors[0].role_ref, RoleRef::role("deleted-role"));
    }

    #[tokio::test]
    async fn service_accounts_match_by_binding_namespace() {
        let stores = stores();
        seed(&stores).await;
        stores
            .role_bindings
            .create(RoleBinding {
                metadata: ObjectMeta::namespaced("ns1", "builder"),
                subjects: vec![Subject {
                    namespace: None,
                    ..Subject::service_account("ignored", "builder")
                }],
                role_ref: RoleRef::role("pod-reader"),
            })
            .await
            .expect("binding");
        let resolver = RuleResolver::new(Arc::new(stores));
        let sa = UserInfo::new("system:serviceaccount:ns1:builder");
        let resolved = resolver
            .rules_for(&sa, &Scope::in_namespace("ns1"))
            .await
            .expect("resolve");
        assert_eq!(resolved.rules, vec![pods(&["get", "list"])]);
    }

    #[tokio::test]
    async fn role_ref_resolution() {
        let stores = stores();
        seed(&stores).await;
        let resolver = RuleResolver::new(Arc::new(stores));

        let rules = resolver
            .rules_for_role_ref(Some("ns1"), &RoleRef::role("pod-reader"))
            .await
            .expect("role");
        assert_eq!(rules, vec![pods(&["get", "list"])]);

        let err = resolver
            .rules_for_role_ref(None, &RoleRef::role("pod-reader"))
            .await
            .expect_err("namespace");
        assert!(matches!(err, ResolveError::NamespaceRequired(_)));

        let err = resolver
            .rules_for_role_ref(None, &RoleRef::cluster_role("missing"))
            .await
            .expect_err("missing");
        assert!(matches!(err, ResolveError::NotFound(_)));
    }
}
