//! Request identity extraction.
//!
//! The policy plane sits behind an authenticating proxy that asserts the
//! caller in `x-remote-user` and zero or more `x-remote-group` headers.
use crate::api::error::{ApiError, api_unauthorized};
use crate::app::AppState;
use crate::auth::context::{EscalationBypass, RequestContext};
use axum::http::HeaderMap;
use warden_rbac::UserInfo;

pub const REMOTE_USER_HEADER: &str = "x-remote-user";
pub const REMOTE_GROUP_HEADER: &str = "x-remote-group";

pub fn user_from_headers(headers: &HeaderMap) -> Result<UserInfo, ApiError> {
    let name = headers
        .get(REMOTE_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| api_unauthorized("missing x-remote-user header"))?;
    let groups = headers
        .get_all(REMOTE_GROUP_HEADER)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();
    Ok(UserInfo {
        name: name.to_string(),
        groups,
    })
}

/// Build the context a guarded write runs under.
pub fn request_context(
    state: &AppState,
    headers: &HeaderMap,
    namespace: Option<&str>,
) -> Result<RequestContext, ApiError> {
    let user = user_from_headers(headers)?;
    let bypass = EscalationBypass::for_superuser(&user, &state.superuser_group);
    let mut ctx = RequestContext::new(user).with_bypass(bypass);
    if let Some(namespace) = namespace {
        ctx = ctx.with_namespace(namespace);
    }
    Ok(ctx)
}
