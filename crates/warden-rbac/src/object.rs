//! Kind-generic view over the four RBAC object types.
//!
//! Storage and the escalation check are written once against [`RbacObject`]
//! so coverage semantics stay identical across kinds.
use crate::rule::PolicyRule;
use crate::types::{
    ClusterRole, ClusterRoleBinding, ObjectMeta, Role, RoleBinding, RoleRef, Scope, Subject,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Role,
    ClusterRole,
    RoleBinding,
    ClusterRoleBinding,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::Role,
        ObjectKind::ClusterRole,
        ObjectKind::RoleBinding,
        ObjectKind::ClusterRoleBinding,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Role => "Role",
            ObjectKind::ClusterRole => "ClusterRole",
            ObjectKind::RoleBinding => "RoleBinding",
            ObjectKind::ClusterRoleBinding => "ClusterRoleBinding",
        }
    }

    /// Plural resource name used in URLs and authorizer attributes.
    pub fn resource(self) -> &'static str {
        match self {
            ObjectKind::Role => "roles",
            ObjectKind::ClusterRole => "clusterroles",
            ObjectKind::RoleBinding => "rolebindings",
            ObjectKind::ClusterRoleBinding => "clusterrolebindings",
        }
    }

    pub fn namespaced(self) -> bool {
        matches!(self, ObjectKind::Role | ObjectKind::RoleBinding)
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an object grants: its own rules, or the rules of a referenced role.
#[derive(Debug, Clone, Copy)]
pub enum Grant<'a> {
    Rules(&'a [PolicyRule]),
    RoleRef {
        role_ref: &'a RoleRef,
        subjects: &'a [Subject],
    },
}

pub trait RbacObject {
    const KIND: ObjectKind;

    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn grant(&self) -> Grant<'_>;

    fn scope(&self) -> Scope {
        Scope::from_namespace(self.metadata().namespace.as_deref())
    }
}

impl RbacObject for Role {
    const KIND: ObjectKind = ObjectKind::Role;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn grant(&self) -> Grant<'_> {
        Grant::Rules(&self.rules)
    }
}

impl RbacObject for ClusterRole {
    const KIND: ObjectKind = ObjectKind::ClusterRole;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn grant(&self) -> Grant<'_> {
        Grant::Rules(&self.rules)
    }
}

impl RbacObject for RoleBinding {
    const KIND: ObjectKind = ObjectKind::RoleBinding;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn grant(&self) -> Grant<'_> {
        Grant::RoleRef {
            role_ref: &self.role_ref,
            subjects: &self.subjects,
        }
    }
}

impl RbacObject for ClusterRoleBinding {
    const KIND: ObjectKind = ObjectKind::ClusterRoleBinding;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn grant(&self) -> Grant<'_> {
        Grant::RoleRef {
            role_ref: &self.role_ref,
            subjects: &self.subjects,
        }
    }

    fn scope(&self) -> Scope {
        Scope::Cluster
    }
}
