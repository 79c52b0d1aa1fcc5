//! Per-request identity and the escalation bypass capability.
use warden_rbac::UserInfo;

/// Proof that the caller may skip escalation checks entirely.
///
/// Only constructible inside this module, so holding one means the request
/// path explicitly minted it (today: membership in the superuser group).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationBypass {
    reason: String,
}

impl EscalationBypass {
    pub fn for_superuser(user: &UserInfo, superuser_group: &str) -> Option<Self> {
        if superuser_group.is_empty() || !user.in_group(superuser_group) {
            return None;
        }
        Some(Self {
            reason: format!("member of {superuser_group}"),
        })
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    user: UserInfo,
    namespace: Option<String>,
    bypass: Option<EscalationBypass>,
}

impl RequestContext {
    pub fn new(user: UserInfo) -> Self {
        Self {
            user,
            namespace: None,
            bypass: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_bypass(mut self, bypass: Option<EscalationBypass>) -> Self {
        self.bypass = bypass;
        self
    }

    pub fn user(&self) -> &UserInfo {
        &self.user
    }

    /// Namespace the request was addressed to, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn escalation_bypass(&self) -> Option<&EscalationBypass> {
        self.bypass.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bypass_requires_group_membership() {
        let admin = UserInfo::new("root").with_groups(&["system:masters"]);
        let alice = UserInfo::new("alice").with_groups(&["dev"]);
        let bypass = EscalationBypass::for_superuser(&admin, "system:masters").expect("bypass");
        assert_eq!(bypass.reason(), "member of system:masters");
        assert!(EscalationBypass::for_superuser(&alice, "system:masters").is_none());
        assert!(EscalationBypass::for_superuser(&admin, "").is_none());
    }

    #[test]
    fn context_builders() {
        let ctx = RequestContext::new(UserInfo::new("alice")).with_namespace("ns1");
        assert_eq!(ctx.namespace(), Some("ns1"));
        assert_eq!(ctx.user().name, "alice");
        assert!(ctx.escalation_bypass().is_none());
    }
}
