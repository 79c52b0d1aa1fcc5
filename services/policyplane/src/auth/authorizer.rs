//! External authorization seam.
//!
//! # Purpose
//! The escalation guard asks an [`Authorizer`] whether the actor holds the
//! `escalate` or `bind` verbs. Every call is bounded by a timeout, and any
//! timeout or failure is surfaced to the caller instead of being treated as
//! a denial without explanation.
use crate::auth::rbac::resolver::{ResolveError, RuleResolver};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use warden_rbac::{RequestAttributes, Scope, allows};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    NoOpinion,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorizerError {
    #[error("authorizer timed out after {0:?}")]
    Timeout(Duration),
    #[error("authorizer unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, attrs: &RequestAttributes) -> Result<Decision, AuthorizerError>;
}

/// Ask `authorizer`, failing with [`AuthorizerError::Timeout`] past `timeout`.
pub async fn authorize_within(
    authorizer: &dyn Authorizer,
    attrs: &RequestAttributes,
    timeout: Duration,
) -> Result<Decision, AuthorizerError> {
    match tokio::time::timeout(timeout, authorizer.authorize(attrs)).await {
        Ok(result) => result,
        Err(_) => Err(AuthorizerError::Timeout(timeout)),
    }
}

/// Authorizer backed by the RBAC objects in the store.
///
/// Allows when any rule granted to the user in the request's scope matches;
/// otherwise it has no opinion. Unresolvable bindings are skipped the same
/// way the escalation guard skips them.
#[derive(Clone)]
pub struct RbacAuthorizer {
    resolver: RuleResolver,
}

impl RbacAuthorizer {
    pub fn new(resolver: RuleResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Authorizer for RbacAuthorizer {
    async fn authorize(&self, attrs: &RequestAttributes) -> Result<Decision, AuthorizerError> {
        let scope = Scope::from_namespace(attrs.namespace());
        let resolved = self
            .resolver
            .rules_for(&attrs.user, &scope)
            .await
            .map_err(|err: ResolveError| AuthorizerError::Unavailable(err.to_string()))?;
        if allows(&resolved.rules, attrs) {
            Ok(Decision::Allow)
        } else {
            Ok(Decision::NoOpinion)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_rbac::UserInfo;

    struct Slow;

    #[async_trait]
    impl Authorizer for Slow {
        async fn authorize(&self, _: &RequestAttributes) -> Result<Decision, AuthorizerError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Decision::Allow)
        }
    }

    struct Fixed(Decision);

    #[async_trait]
    impl Authorizer for Fixed {
        async fn authorize(&self, _: &RequestAttributes) -> Result<Decision, AuthorizerError> {
            Ok(self.0)
        }
    }

    fn attrs() -> RequestAttributes {
        RequestAttributes::non_resource(UserInfo::new("alice"), "get", "/healthz")
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let err = authorize_within(&Slow, &attrs(), Duration::from_millis(50))
            .await
            .expect_err("timeout");
        assert_eq!(err, AuthorizerError::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn decisions_pass_through() {
        let decision = authorize_within(&Fixed(Decision::Deny), &attrs(), Duration::from_secs(1))
            .await
            .expect("decision");
        assert!(!decision.is_allowed());
        let decision = authorize_within(&Fixed(Decision::Allow), &attrs(), Duration::from_secs(1))
            .await
            .expect("decision");
        assert!(decision.is_allowed());
    }
}
