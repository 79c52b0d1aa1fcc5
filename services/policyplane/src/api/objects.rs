//! RBAC object API handlers.
//!
//! # Purpose
//! CRUD and change-feed endpoints for the four RBAC kinds. Handlers are
//! written once over [`ApiObject`] and instantiated per kind in the router.
//! Creates and updates go through the kind's [`GuardedStore`]; reads,
//! deletes, and the change feed pass straight through.
use crate::api::error::{ApiError, api_not_found};
use crate::api::identity::request_context;
use crate::api::types::{ObjectList, WatchQuery};
use crate::app::AppState;
use crate::auth::rbac::GuardedStore;
use crate::store::ObjectKey;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use warden_rbac::{ClusterRole, ClusterRoleBinding, ObjectKind, RbacObject, Role, RoleBinding};

/// An RBAC kind served over HTTP.
pub trait ApiObject:
    RbacObject + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    fn store(state: &AppState) -> &GuardedStore<Self>;
}

impl ApiObject for Role {
    fn store(state: &AppState) -> &GuardedStore<Self> {
        &state.roles
    }
}

impl ApiObject for ClusterRole {
    fn store(state: &AppState) -> &GuardedStore<Self> {
        &state.cluster_roles
    }
}

impl ApiObject for RoleBinding {
    fn store(state: &AppState) -> &GuardedStore<Self> {
        &state.role_bindings
    }
}

impl ApiObject for ClusterRoleBinding {
    fn store(state: &AppState) -> &GuardedStore<Self> {
        &state.cluster_role_bindings
    }
}

pub async fn list_cluster<T: ApiObject>(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ObjectList<T>>, ApiError> {
    list::<T>(&state, &headers, None).await
}

pub async fn create_cluster<T: ApiObject>(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<T>,
) -> Result<impl IntoResponse, ApiError> {
    create(&state, &headers, None, body).await
}

pub async fn get_cluster<T: ApiObject>(
    Path(name): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<T>, ApiError> {
    get(&state, &headers, None, name).await
}

pub async fn update_cluster<T: ApiObject>(
    Path(name): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<T>,
) -> Result<Json<T>, ApiError> {
    update(&state, &headers, None, name, body).await
}

pub async fn delete_cluster<T: ApiObject>(
    Path(name): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    delete::<T>(&state, &headers, None, name).await
}

pub async fn list_namespaced<T: ApiObject>(
    Path(namespace): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ObjectList<T>>, ApiError> {
    list::<T>(&state, &headers, Some(namespace)).await
}

pub async fn create_namespaced<T: ApiObject>(
    Path(namespace): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<T>,
) -> Result<impl IntoResponse, ApiError> {
    create(&state, &headers, Some(namespace), body).await
}

pub async fn get_namespaced<T: ApiObject>(
    Path((namespace, name)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<T>, ApiError> {
    get(&state, &headers, Some(namespace), name).await
}

pub async fn update_namespaced<T: ApiObject>(
    Path((namespace, name)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<T>,
) -> Result<Json<T>, ApiError> {
    update(&state, &headers, Some(namespace), name, body).await
}

pub async fn delete_namespaced<T: ApiObject>(
    Path((namespace, name)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    delete::<T>(&state, &headers, Some(namespace), name).await
}

/// Change feed for one kind, starting at sequence `since`.
pub async fn watch(
    Path(kind): Path<String>,
    Query(query): Query<WatchQuery>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    request_context(&state, &headers, None)?;
    let kind = ObjectKind::ALL
        .into_iter()
        .find(|candidate| candidate.resource() == kind)
        .ok_or_else(|| api_not_found(&format!("unknown kind {kind:?}")))?;
    let response = match kind {
        ObjectKind::Role => Json(state.roles.changes(query.since).await?).into_response(),
        ObjectKind::ClusterRole => {
            Json(state.cluster_roles.changes(query.since).await?).into_response()
        }
        ObjectKind::RoleBinding => {
            Json(state.role_bindings.changes(query.since).await?).into_response()
        }
        ObjectKind::ClusterRoleBinding => {
            Json(state.cluster_role_bindings.changes(query.since).await?).into_response()
        }
    };
    Ok(response)
}

fn object_key(namespace: Option<String>, name: String) -> ObjectKey {
    ObjectKey { namespace, name }
}

async fn list<T: ApiObject>(
    state: &AppState,
    headers: &HeaderMap,
    namespace: Option<String>,
) -> Result<Json<ObjectList<T>>, ApiError> {
    request_context(state, headers, namespace.as_deref())?;
    let items = T::store(state).list(namespace.as_deref()).await?;
    Ok(Json(ObjectList { items }))
}

async fn create<T: ApiObject>(
    state: &AppState,
    headers: &HeaderMap,
    namespace: Option<String>,
    body: T,
) -> Result<(StatusCode, Json<T>), ApiError> {
    let ctx = request_context(state, headers, namespace.as_deref())?;
    let created = T::store(state).create(&ctx, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get<T: ApiObject>(
    state: &AppState,
    headers: &HeaderMap,
    namespace: Option<String>,
    name: String,
) -> Result<Json<T>, ApiError> {
    request_context(state, headers, namespace.as_deref())?;
    let object = T::store(state).get(&object_key(namespace, name)).await?;
    Ok(Json(object))
}

/// Replace an object with `body`.
///
/// Name and namespace default to the path; a non-zero
/// `metadata.resourceVersion` in the body is an update precondition.
async fn update<T: ApiObject>(
    state: &AppState,
    headers: &HeaderMap,
    namespace: Option<String>,
    name: String,
    mut body: T,
) -> Result<Json<T>, ApiError> {
    let ctx = request_context(state, headers, namespace.as_deref())?;
    let meta = body.metadata_mut();
    if meta.name.is_empty() {
        meta.name = name.clone();
    }
    if meta.namespace.is_none() {
        meta.namespace = namespace.clone();
    }
    let key = object_key(namespace, name);
    let updated = T::store(state)
        .update(&ctx, &key, move |_current| Ok(body))
        .await?;
    Ok(Json(updated))
}

async fn delete<T: ApiObject>(
    state: &AppState,
    headers: &HeaderMap,
    namespace: Option<String>,
    name: String,
) -> Result<StatusCode, ApiError> {
    let ctx = request_context(state, headers, namespace.as_deref())?;
    T::store(state)
        .delete(&ctx, &object_key(namespace, name))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
