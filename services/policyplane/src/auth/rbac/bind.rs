//! Binding authorization check.
//!
//! Lets an actor create a binding to a role they have been explicitly
//! authorized to `bind`, even when they do not hold that role's rules.
use crate::auth::authorizer::{Authorizer, AuthorizerError, authorize_within};
use std::sync::Arc;
use std::time::Duration;
use warden_rbac::{RBAC_API_GROUP, RequestAttributes, ResourceAttributes, RoleRef, Scope, UserInfo};

pub const VERB_BIND: &str = "bind";

#[derive(Clone)]
pub struct BindingAuthorization {
    authorizer: Arc<dyn Authorizer>,
    timeout: Duration,
}

impl BindingAuthorization {
    pub fn new(authorizer: Arc<dyn Authorizer>, timeout: Duration) -> Self {
        Self {
            authorizer,
            timeout,
        }
    }

    pub async fn can_bind(
        &self,
        user: &UserInfo,
        role_ref: &RoleRef,
        scope: &Scope,
    ) -> Result<bool, AuthorizerError> {
        let attrs = bind_attributes(user, role_ref, scope);
        let decision = authorize_within(self.authorizer.as_ref(), &attrs, self.timeout).await?;
        Ok(decision.is_allowed())
    }
}

pub fn bind_attributes(user: &UserInfo, role_ref: &RoleRef, scope: &Scope) -> RequestAttributes {
    RequestAttributes::resource(
        user.clone(),
        VERB_BIND,
        ResourceAttributes::new(RBAC_API_GROUP, role_ref.kind.resource())
            .named(role_ref.name.clone())
            .in_namespace(scope.namespace()),
    )
}
