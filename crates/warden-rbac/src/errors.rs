use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RbacError {
    #[error("metadata.name must not be empty")]
    MissingName,
    #[error("{kind} requires metadata.namespace")]
    MissingNamespace { kind: &'static str },
    #[error("{kind} must not set metadata.namespace")]
    UnexpectedNamespace { kind: &'static str },
    #[error("rules[{index}]: {reason}")]
    InvalidRule { index: usize, reason: String },
    #[error("invalid roleRef: {0}")]
    InvalidRoleRef(String),
    #[error("subjects[{index}]: {reason}")]
    InvalidSubject { index: usize, reason: String },
    #[error("roleRef is immutable: cannot change {from} to {to}")]
    RoleRefChanged { from: String, to: String },
}

pub type RbacResult<T> = Result<T, RbacError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        let errors = vec![
            RbacError::MissingName,
            RbacError::MissingNamespace { kind: "Role" },
            RbacError::UnexpectedNamespace { kind: "ClusterRole" },
            RbacError::InvalidRule {
                index: 2,
                reason: "verbs must not be empty".to_string(),
            },
            RbacError::InvalidRoleRef("bad".to_string()),
            RbacError::InvalidSubject {
                index: 0,
                reason: "name must not be empty".to_string(),
            },
            RbacError::RoleRefChanged {
                from: "Role/a".to_string(),
                to: "Role/b".to_string(),
            },
        ];

        for error in errors {
            let rendered = error.to_string();
            assert!(!rendered.is_empty());
        }
    }

    #[test]
    fn invalid_rule_mentions_index() {
        let err = RbacError::InvalidRule {
            index: 3,
            reason: "mixed".to_string(),
        };
        assert_eq!(err.to_string(), "rules[3]: mixed");
    }
}
