#![allow(dead_code)]

use policyplane::app::AppState;
use policyplane::auth::rbac::bootstrap::seed_default_policy;
use policyplane::store::{RbacStores, StoreConfig};
use std::time::Duration;

pub const SUPERUSER_GROUP: &str = "system:masters";

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn test_stores() -> RbacStores {
    RbacStores::in_memory(StoreConfig {
        changes_limit: 100,
        change_retention_max_rows: None,
    })
}

/// Store-backed state with the default policy seeded.
pub async fn seeded_state() -> (AppState, RbacStores) {
    let stores = test_stores();
    seed_default_policy(&stores, SUPERUSER_GROUP)
        .await
        .expect("seed");
    let state =
        AppState::with_rbac_authorizer(stores.clone(), Duration::from_secs(1), SUPERUSER_GROUP);
    (state, stores)
}
