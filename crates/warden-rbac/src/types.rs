//! RBAC object types.
//!
//! # Purpose
//! Defines the four permission-granting object kinds, their metadata, the
//! subjects they grant to, and the scope a check runs in.
//!
//! # Key invariants
//! - Role and RoleBinding are namespaced; ClusterRole and ClusterRoleBinding
//!   are not.
//! - A binding holds exactly one [`RoleRef`].
//! - `resource_version` is owned by the store; clients echo it back as an
//!   update precondition.
//!
//! # Examples
//! ```rust
//! use warden_rbac::{RoleRef, Scope};
//!
//! let role_ref = RoleRef::cluster_role("view");
//! assert_eq!(role_ref.to_string(), "ClusterRole/view");
//! assert_eq!(Scope::in_namespace("ns1").namespace(), Some("ns1"));
//! ```
use crate::rule::PolicyRule;
use serde::{Deserialize, Serialize};

/// API group the RBAC kinds live in; used when asking the authorizer about
/// `bind` and `escalate`.
pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub resource_version: u64,
}

impl ObjectMeta {
    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            resource_version: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
    User,
    Group,
    ServiceAccount,
}

/// Identity a binding grants its role to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub kind: SubjectKind,
    pub name: String,
    /// Service account namespace; defaults to the binding's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Subject {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::User,
            name: name.into(),
            namespace: None,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Group,
            name: name.into(),
            namespace: None,
        }
    }

    pub fn service_account(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::ServiceAccount,
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleRefKind {
    Role,
    ClusterRole,
}

impl RoleRefKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RoleRefKind::Role => "Role",
            RoleRefKind::ClusterRole => "ClusterRole",
        }
    }

    /// Resource name used in authorizer attributes.
    pub fn resource(self) -> &'static str {
        match self {
            RoleRefKind::Role => "roles",
            RoleRefKind::ClusterRole => "clusterroles",
        }
    }
}

/// Reference from a binding to the role it grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
    pub kind: RoleRefKind,
    pub name: String,
}

impl RoleRef {
    pub fn role(name: impl Into<String>) -> Self {
        Self {
            kind: RoleRefKind::Role,
            name: name.into(),
        }
    }

    pub fn cluster_role(name: impl Into<String>) -> Self {
        Self {
            kind: RoleRefKind::ClusterRole,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RoleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRole {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    pub role_ref: RoleRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRoleBinding {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    pub role_ref: RoleRef,
}

/// Where a check or resolution applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Cluster,
    Namespace(String),
}

impl Scope {
    pub fn in_namespace(name: impl Into<String>) -> Self {
        Scope::Namespace(name.into())
    }

    /// Scope of an object with the given namespace field.
    pub fn from_namespace(namespace: Option<&str>) -> Self {
        match namespace {
            Some(ns) => Scope::Namespace(ns.to_string()),
            None => Scope::Cluster,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            Scope::Cluster => None,
            Scope::Namespace(ns) => Some(ns),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Cluster => f.write_str("cluster"),
            Scope::Namespace(ns) => write!(f, "namespace {ns}"),
        }
    }
}
