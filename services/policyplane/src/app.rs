//! Policy-plane HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! This module centralizes route composition to keep `main` small and testable.
use crate::api;
use crate::api::objects;
use crate::auth::authorizer::{Authorizer, RbacAuthorizer};
use crate::auth::rbac::{EscalationGuard, GuardedStore, RuleResolver};
use crate::store::RbacStores;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use warden_rbac::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};

#[derive(Clone)]
pub struct AppState {
    pub stores: RbacStores,
    pub roles: GuardedStore<Role>,
    pub cluster_roles: GuardedStore<ClusterRole>,
    pub role_bindings: GuardedStore<RoleBinding>,
    pub cluster_role_bindings: GuardedStore<ClusterRoleBinding>,
    pub superuser_group: String,
}

impl AppState {
    /// Wire guarded stores over `stores`, consulting `authorizer` for the
    /// `escalate` and `bind` checks.
    pub fn new(
        stores: RbacStores,
        authorizer: Arc<dyn Authorizer>,
        authorizer_timeout: Duration,
        superuser_group: impl Into<String>,
    ) -> Self {
        let resolver = RuleResolver::new(Arc::new(stores.clone()));
        let guard = EscalationGuard::new(resolver, authorizer, authorizer_timeout);
        Self {
            roles: GuardedStore::new(stores.roles.clone(), guard.clone()),
            cluster_roles: GuardedStore::new(stores.cluster_roles.clone(), guard.clone()),
            role_bindings: GuardedStore::new(stores.role_bindings.clone(), guard.clone()),
            cluster_role_bindings: GuardedStore::new(stores.cluster_role_bindings.clone(), guard),
            stores,
            superuser_group: superuser_group.into(),
        }
    }

    /// Same as [`AppState::new`] with the store-backed [`RbacAuthorizer`].
    pub fn with_rbac_authorizer(
        stores: RbacStores,
        authorizer_timeout: Duration,
        superuser_group: impl Into<String>,
    ) -> Self {
        let authorizer = RbacAuthorizer::new(RuleResolver::new(Arc::new(stores.clone())));
        Self::new(
            stores,
            Arc::new(authorizer),
            authorizer_timeout,
            superuser_group,
        )
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    Router::new()
        .route("/healthz", get(api::system::healthz))
        .route(
            "/apis/rbac/v1/clusterroles",
            get(objects::list_cluster::<ClusterRole>).post(objects::create_cluster::<ClusterRole>),
        )
        .route(
            "/apis/rbac/v1/clusterroles/:name",
            get(objects::get_cluster::<ClusterRole>)
                .put(objects::update_cluster::<ClusterRole>)
                .delete(objects::delete_cluster::<ClusterRole>),
        )
        .route(
            "/apis/rbac/v1/clusterrolebindings",
            get(objects::list_cluster::<ClusterRoleBinding>)
                .post(objects::create_cluster::<ClusterRoleBinding>),
        )
        .route(
            "/apis/rbac/v1/clusterrolebindings/:name",
            get(objects::get_cluster::<ClusterRoleBinding>)
                .put(objects::update_cluster::<ClusterRoleBinding>)
                .delete(objects::delete_cluster::<ClusterRoleBinding>),
        )
        .route(
            "/apis/rbac/v1/namespaces/:namespace/roles",
            get(objects::list_namespaced::<Role>).post(objects::create_namespaced::<Role>),
        )
        .route(
            "/apis/rbac/v1/namespaces/:namespace/roles/:name",
            get(objects::get_namespaced::<Role>)
                .put(objects::update_namespaced::<Role>)
                .delete(objects::delete_namespaced::<Role>),
        )
        .route(
            "/apis/rbac/v1/namespaces/:namespace/rolebindings",
            get(objects::list_namespaced::<RoleBinding>)
                .post(objects::create_namespaced::<RoleBinding>),
        )
        .route(
            "/apis/rbac/v1/namespaces/:namespace/rolebindings/:name",
            get(objects::get_namespaced::<RoleBinding>)
                .put(objects::update_namespaced::<RoleBinding>)
                .delete(objects::delete_namespaced::<RoleBinding>),
        )
        .route("/apis/rbac/v1/watch/:kind", get(objects::watch))
        .layer(trace_layer)
        .with_state(state)
}
