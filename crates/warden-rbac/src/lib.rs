//! Warden RBAC primitives shared by the policy plane and its clients.
//!
//! # Purpose
//! Centralizes the RBAC object model (roles, bindings, subjects), the policy
//! rule coverage matcher used for escalation prevention, and admission
//! validation of rule-bearing objects.
//!
//! # How it fits
//! The policy plane stores these objects and runs every create/update of a
//! permission-granting object through an escalation check built on
//! [`covers`] and [`uncovered_rules`]. The rule-backed authorizer answers
//! ordinary questions through [`allows`].
//!
//! # Key invariants
//! - An empty verbs, apiGroups or resources list matches nothing; only the
//!   literal `*` grants "all".
//! - Coverage is checked per atomic (verb, group, resource, name) tuple, so a
//!   union of narrow rules can cover a broader one.
//! - A rule populates either resource attributes or nonResourceURLs, never both.
//!
//! # Examples
//! ```rust
//! use warden_rbac::{PolicyRule, covers};
//!
//! let granted = vec![PolicyRule::resource(&["*"], &[""], &["pods"])];
//! let candidate = PolicyRule::resource(&["get", "delete"], &[""], &["pods"]);
//! assert!(covers(&candidate, &granted));
//! ```
//!
//! # Common pitfalls
//! - Treating an empty list as a wildcard widens grants silently.
//! - Skipping [`validate_object`] lets mixed-axis rules into the store.

mod attributes;
mod errors;
mod matcher;
mod object;
mod rule;
mod subject;
mod types;
mod validation;

pub use attributes::{
    AttributesTarget, NonResourceAttributes, RequestAttributes, ResourceAttributes,
};
pub use errors::{RbacError, RbacResult};
pub use matcher::{UncoveredRules, allows, covers, non_resource_url_matches, uncovered_rules};
pub use object::{Grant, ObjectKind, RbacObject};
pub use rule::{PolicyRule, VERB_ALL};
pub use subject::{SERVICE_ACCOUNT_USER_PREFIX, UserInfo, service_account_username};
pub use types::{
    ClusterRole, ClusterRoleBinding, ObjectMeta, RBAC_API_GROUP, Role, RoleBinding, RoleRef,
    RoleRefKind, Scope, Subject, SubjectKind,
};
pub use validation::{validate_object, validate_role_ref_unchanged, validate_rule};
