//! Authenticated user identity and subject matching.
use crate::types::{Subject, SubjectKind};
use serde::{Deserialize, Serialize};

pub const SERVICE_ACCOUNT_USER_PREFIX: &str = "system:serviceaccount:";

/// Acting identity of a request, as established by authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl UserInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|group| group.to_string()).collect();
        self
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|candidate| candidate == group)
    }
}

/// User name a service account authenticates as.
pub fn service_account_username(namespace: &str, name: &str) -> String {
    format!("{SERVICE_ACCOUNT_USER_PREFIX}{namespace}:{name}")
}

impl Subject {
    /// Whether this subject names `user`.
    ///
    /// `binding_namespace` is the namespace of the binding holding the
    /// subject; service account subjects without a namespace inherit it.
    pub fn applies_to(&self, user: &UserInfo, binding_namespace: Option<&str>) -> bool {
        match self.kind {
            SubjectKind::User => self.name == user.name,
            SubjectKind::Group => user.in_group(&self.name),
            SubjectKind::ServiceAccount => {
                let Some(namespace) = self.namespace.as_deref().or(binding_namespace) else {
                    return false;
                };
                user.name == service_account_username(namespace, &self.name)
            }
        }
    }
}
