//! HTTP API request/response types.
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub backend: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ObjectList<T> {
    pub items: Vec<T>,
}

/// Query for the per-kind change feed.
#[derive(Debug, Deserialize, Default)]
pub struct WatchQuery {
    #[serde(default)]
    pub since: u64,
}
