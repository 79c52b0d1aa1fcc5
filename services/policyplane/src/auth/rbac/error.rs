use crate::auth::authorizer::AuthorizerError;
use crate::auth::rbac::resolver::ResolveError;
use crate::store::StoreError;
use thiserror::Error;
use warden_rbac::RbacError;

/// Outcome of a rejected guarded write.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Invalid(#[from] RbacError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
}

impl From<StoreError> for GuardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(message) => GuardError::NotFound(message),
            StoreError::Conflict(message) => GuardError::Conflict(message),
            StoreError::Unexpected(err) => GuardError::Unavailable(format!("store error: {err:#}")),
        }
    }
}

impl From<AuthorizerError> for GuardError {
    fn from(err: AuthorizerError) -> Self {
        GuardError::Unavailable(err.to_string())
    }
}

impl From<ResolveError> for GuardError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(message) => GuardError::Forbidden(message),
            ResolveError::NamespaceRequired(message) => GuardError::BadRequest(message),
            ResolveError::Lookup(err) => {
                GuardError::Unavailable(format!("rule resolution failed: {err}"))
            }
        }
    }
}
