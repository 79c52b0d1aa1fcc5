//! Privilege-escalation guard for RBAC writes.
//!
//! # Purpose
//! Rejects any create or update of a role or binding that would grant
//! permissions the acting user does not already hold.
//!
//! # Decision order
//! 1. An [`EscalationBypass`](crate::auth::context::EscalationBypass) on the
//!    request context allows outright.
//! 2. Roles: the authorizer may grant `escalate` on the role.
//!    Bindings: the authorizer may grant `bind` on the referenced role.
//! 3. Otherwise the actor's own rules in the object's scope must cover every
//!    rule the object grants.
//!
//! Authorizer timeouts and failures deny with [`GuardError::Unavailable`];
//! they never fall through to the coverage check.
use crate::auth::authorizer::{Authorizer, authorize_within};
use crate::auth::context::RequestContext;
use crate::auth::rbac::bind::BindingAuthorization;
use crate::auth::rbac::error::GuardError;
use crate::auth::rbac::resolver::{ResolutionError, RuleResolver};
use std::sync::Arc;
use std::time::Duration;
use warden_rbac::{
    Grant, ObjectKind, PolicyRule, RBAC_API_GROUP, RbacObject, RequestAttributes,
    ResourceAttributes, Scope, UncoveredRules, UserInfo, uncovered_rules,
};

pub const VERB_ESCALATE: &str = "escalate";

/// Uncovered rules listed in a Forbidden message before it is cut short.
pub const MAX_REPORTED_RULES: usize = 20;

#[derive(Clone)]
pub struct EscalationGuard {
    resolver: RuleResolver,
    authorizer: Arc<dyn Authorizer>,
    binding: BindingAuthorization,
    authorizer_timeout: Duration,
}

impl EscalationGuard {
    pub fn new(
        resolver: RuleResolver,
        authorizer: Arc<dyn Authorizer>,
        authorizer_timeout: Duration,
    ) -> Self {
        let binding = BindingAuthorization::new(authorizer.clone(), authorizer_timeout);
        Self {
            resolver,
            authorizer,
            binding,
            authorizer_timeout,
        }
    }

    /// Check that writing `object` does not escalate the actor's privileges.
    pub async fn check<T: RbacObject + Sync>(
        &self,
        ctx: &RequestContext,
        object: &T,
    ) -> Result<(), GuardError> {
        let result = self.decide(ctx, object).await;
        let outcome = match &result {
            Ok(Outcome::Bypass) => "bypass",
            Ok(Outcome::Authorized) => "authorized",
            Ok(Outcome::Covered) => "covered",
            Err(GuardError::Forbidden(_)) => "forbidden",
            Err(_) => "error",
        };
        metrics::counter!(
            "policyplane_escalation_decisions_total",
            "kind" => T::KIND.as_str(),
            "outcome" => outcome
        )
        .increment(1);
        match &result {
            Ok(_) => tracing::debug!(
                user = %ctx.user().name,
                kind = %T::KIND,
                name = %object.metadata().name,
                outcome,
                "escalation check passed"
            ),
            Err(err) => tracing::info!(
                user = %ctx.user().name,
                kind = %T::KIND,
                name = %object.metadata().name,
                outcome,
                error = %err,
                "escalation check rejected write"
            ),
        }
        result.map(|_| ())
    }

    async fn decide<T: RbacObject + Sync>(
        &self,
        ctx: &RequestContext,
        object: &T,
    ) -> Result<Outcome, GuardError> {
        if ctx.escalation_bypass().is_some() {
            return Ok(Outcome::Bypass);
        }
        let user = ctx.user();
        let scope = object.scope();
        match object.grant() {
            Grant::Rules(rules) => {
                if self
                    .can_escalate(user, T::KIND, &object.metadata().name, &scope)
                    .await?
                {
                    return Ok(Outcome::Authorized);
                }
                self.ensure_covered(user, &scope, rules).await?;
                Ok(Outcome::Covered)
            }
            Grant::RoleRef { role_ref, .. } => {
                if self.binding.can_bind(user, role_ref, &scope).await? {
                    return Ok(Outcome::Authorized);
                }
                let granted = self
                    .resolver
                    .rules_for_role_ref(scope.namespace(), role_ref)
                    .await?;
                self.ensure_covered(user, &scope, &granted).await?;
                Ok(Outcome::Covered)
            }
        }
    }

    async fn can_escalate(
        &self,
        user: &UserInfo,
        kind: ObjectKind,
        name: &str,
        scope: &Scope,
    ) -> Result<bool, GuardError> {
        let attrs = RequestAttributes::resource(
            user.clone(),
            VERB_ESCALATE,
            ResourceAttributes::new(RBAC_API_GROUP, kind.resource())
                .named(name)
                .in_namespace(scope.namespace()),
        );
        let decision =
            authorize_within(self.authorizer.as_ref(), &attrs, self.authorizer_timeout).await?;
        Ok(decision.is_allowed())
    }

    async fn ensure_covered(
        &self,
        user: &UserInfo,
        scope: &Scope,
        candidates: &[PolicyRule],
    ) -> Result<(), GuardError> {
        let held = self.resolver.rules_for(user, scope).await?;
        let missing = uncovered_rules(candidates, &held.rules, MAX_REPORTED_RULES);
        if missing.is_empty() {
            return Ok(());
        }
        Err(GuardError::Forbidden(forbidden_message(
            user,
            &missing,
            &held.errors,
        )))
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Bypass,
    Authorized,
    Covered,
}

fn forbidden_message(
    user: &UserInfo,
    missing: &UncoveredRules,
    errors: &[ResolutionError],
) -> String {
    let mut message = format!(
        "user {:?} (groups={:?}) is attempting to grant RBAC permissions not currently held:",
        user.name, user.groups
    );
    for rule in &missing.rules {
        message.push('\n');
        message.push_str(&rule.to_string());
    }
    if missing.truncated {
        message.push_str("\n... and more");
    }
    if !errors.is_empty() {
        message.push_str("; resolution errors: [");
        let rendered: Vec<String> = errors
            .iter()
            .take(MAX_REPORTED_RULES)
            .map(ToString::to_string)
            .collect();
        message.push_str(&rendered.join(", "));
        if errors.len() > MAX_REPORTED_RULES {
            message.push_str(", ...");
        }
        message.push(']');
    }
    message
}
