//! Admission validation for RBAC objects.
//!
//! Runs before any escalation check so malformed objects (for example rules
//! mixing resource attributes with nonResourceURLs) never reach coverage.
use crate::errors::{RbacError, RbacResult};
use crate::object::{Grant, ObjectKind, RbacObject};
use crate::rule::{PolicyRule, VERB_ALL};
use crate::types::{RoleRef, RoleRefKind, SubjectKind};

/// Validate one rule of an object of the given kind.
pub fn validate_rule(kind: ObjectKind, index: usize, rule: &PolicyRule) -> RbacResult<()> {
    let invalid = |reason: &str| RbacError::InvalidRule {
        index,
        reason: reason.to_string(),
    };
    if rule.verbs.is_empty() {
        return Err(invalid("verbs must not be empty"));
    }
    match (rule.has_resource_attributes(), rule.has_non_resource_urls()) {
        (true, true) => Err(invalid(
            "rule must not mix resource attributes with nonResourceURLs",
        )),
        (false, false) => Err(invalid("rule must set resources or nonResourceURLs")),
        (true, false) => {
            if rule.api_groups.is_empty() {
                return Err(invalid("apiGroups must not be empty"));
            }
            if rule.resources.is_empty() {
                return Err(invalid("resources must not be empty"));
            }
            Ok(())
        }
        (false, true) => {
            if kind.namespaced() {
                return Err(invalid("namespaced rules cannot apply to nonResourceURLs"));
            }
            for url in &rule.non_resource_urls {
                validate_url_pattern(url).map_err(|reason| invalid(&reason))?;
            }
            Ok(())
        }
    }
}

/// Validate an object's shape for admission.
pub fn validate_object<T: RbacObject>(object: &T) -> RbacResult<()> {
    let meta = object.metadata();
    if meta.name.trim().is_empty() {
        return Err(RbacError::MissingName);
    }
    match (T::KIND.namespaced(), meta.namespace.as_deref()) {
        (true, None) | (true, Some("")) => {
            return Err(RbacError::MissingNamespace {
                kind: T::KIND.as_str(),
            });
        }
        (false, Some(_)) => {
            return Err(RbacError::UnexpectedNamespace {
                kind: T::KIND.as_str(),
            });
        }
        _ => {}
    }

    match object.grant() {
        Grant::Rules(rules) => {
            for (index, rule) in rules.iter().enumerate() {
                validate_rule(T::KIND, index, rule)?;
            }
        }
        Grant::RoleRef { role_ref, subjects } => {
            if role_ref.name.trim().is_empty() {
                return Err(RbacError::InvalidRoleRef("name must not be empty".to_string()));
            }
            if T::KIND == ObjectKind::ClusterRoleBinding && role_ref.kind != RoleRefKind::ClusterRole
            {
                return Err(RbacError::InvalidRoleRef(
                    "ClusterRoleBinding may only reference a ClusterRole".to_string(),
                ));
            }
            for (index, subject) in subjects.iter().enumerate() {
                if subject.name.trim().is_empty() {
                    return Err(RbacError::InvalidSubject {
                        index,
                        reason: "name must not be empty".to_string(),
                    });
                }
                if subject.kind != SubjectKind::ServiceAccount && subject.namespace.is_some() {
                    return Err(RbacError::InvalidSubject {
                        index,
                        reason: "only ServiceAccount subjects carry a namespace".to_string(),
                    });
                }
                if subject.kind == SubjectKind::ServiceAccount
                    && T::KIND == ObjectKind::ClusterRoleBinding
                    && subject.namespace.is_none()
                {
                    return Err(RbacError::InvalidSubject {
                        index,
                        reason: "ServiceAccount subjects of a ClusterRoleBinding need a namespace"
                            .to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Reject updates that point an existing binding at a different role.
pub fn validate_role_ref_unchanged(previous: &RoleRef, next: &RoleRef) -> RbacResult<()> {
    if previous == next {
        return Ok(());
    }
    Err(RbacError::RoleRefChanged {
        from: previous.to_string(),
        to: next.to_string(),
    })
}

fn validate_url_pattern(url: &str) -> Result<(), String> {
    if url == VERB_ALL {
        return Ok(());
    }
    if !url.starts_with('/') {
        return Err(format!("nonResourceURL {url:?} must start with '/'"));
    }
    if let Some(pos) = url.find('*') {
        if pos != url.len() - 1 {
            return Err(format!("nonResourceURL {url:?} may only end in '*'"));
        }
    }
    Ok(())
}
