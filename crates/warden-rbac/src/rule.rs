//! Policy rule primitive.
//!
//! # Purpose
//! Defines the permission grant carried by roles and cluster roles, plus
//! compact rendering used in denial messages.
//!
//! # Key invariants
//! - Lists are sets semantically; order and duplicates carry no meaning.
//! - `*` is the only wildcard value on the verb, group and resource axes.
//! - Empty `resource_names` means "all names"; any other empty list means
//!   "nothing".
//!
//! # Examples
//! ```rust
//! use warden_rbac::PolicyRule;
//!
//! let rule = PolicyRule::resource(&["get"], &[""], &["pods"]).with_names(&["web-0"]);
//! assert_eq!(
//!     rule.to_string(),
//!     r#"{apiGroups:[""], resources:["pods"], resourceNames:["web-0"], verbs:["get"]}"#
//! );
//! ```
use serde::{Deserialize, Serialize};

/// Wildcard value granting every verb, group or resource.
pub const VERB_ALL: &str = "*";

/// Permission grant over resource attributes or non-resource URLs.
///
/// # Invariants
/// - Exactly one axis is populated on admitted objects; see
///   [`crate::validate_rule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub api_groups: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub resource_names: Vec<String>,
    #[serde(default, rename = "nonResourceURLs")]
    pub non_resource_urls: Vec<String>,
}

impl PolicyRule {
    /// Build a resource rule from verb, group and resource lists.
    pub fn resource(verbs: &[&str], api_groups: &[&str], resources: &[&str]) -> Self {
        Self {
            verbs: owned(verbs),
            api_groups: owned(api_groups),
            resources: owned(resources),
            ..Self::default()
        }
    }

    /// Build a non-resource rule from verbs and URL patterns.
    pub fn non_resource(verbs: &[&str], urls: &[&str]) -> Self {
        Self {
            verbs: owned(verbs),
            non_resource_urls: owned(urls),
            ..Self::default()
        }
    }

    /// Restrict the rule to the given resource names.
    pub fn with_names(mut self, names: &[&str]) -> Self {
        self.resource_names = owned(names);
        self
    }

    pub fn has_resource_attributes(&self) -> bool {
        !self.api_groups.is_empty() || !self.resources.is_empty() || !self.resource_names.is_empty()
    }

    pub fn has_non_resource_urls(&self) -> bool {
        !self.non_resource_urls.is_empty()
    }
}

impl std::fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if !self.api_groups.is_empty() {
            parts.push(format!("apiGroups:{}", quoted(&self.api_groups)));
        }
        if !self.resources.is_empty() {
            parts.push(format!("resources:{}", quoted(&self.resources)));
        }
        if !self.resource_names.is_empty() {
            parts.push(format!("resourceNames:{}", quoted(&self.resource_names)));
        }
        if !self.non_resource_urls.is_empty() {
            parts.push(format!("nonResourceURLs:{}", quoted(&self.non_resource_urls)));
        }
        parts.push(format!("verbs:{}", quoted(&self.verbs)));
        write!(f, "{{{}}}", parts.join(", "))
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn quoted(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|value| format!("{value:?}")).collect();
    format!("[{}]", items.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_populated_axes_only() {
        let rule = PolicyRule::resource(&["get", "list"], &["apps"], &["deployments"]);
        assert_eq!(
            rule.to_string(),
            r#"{apiGroups:["apps"], resources:["deployments"], verbs:["get" "list"]}"#
        );

        let rule = PolicyRule::non_resource(&["get"], &["/healthz"]);
        assert_eq!(rule.to_string(), r#"{nonResourceURLs:["/healthz"], verbs:["get"]}"#);
    }

    #[test]
    fn serde_uses_camel_case_and_defaults() {
        let rule: PolicyRule = serde_json::from_str(
            r#"{"verbs":["get"],"apiGroups":[""],"resources":["pods"],"resourceNames":["a"]}"#,
        )
        .expect("parse rule");
        assert_eq!(rule.resource_names, vec!["a".to_string()]);
        assert!(rule.non_resource_urls.is_empty());

        let rule: PolicyRule =
            serde_json::from_str(r#"{"verbs":["get"],"nonResourceURLs":["/metrics"]}"#)
                .expect("parse non-resource rule");
        assert_eq!(rule.non_resource_urls, vec!["/metrics".to_string()]);
        assert!(!rule.has_resource_attributes());
    }

    #[test]
    fn axis_detection() {
        let rule = PolicyRule::resource(&["get"], &[""], &["pods"]);
        assert!(rule.has_resource_attributes());
        assert!(!rule.has_non_resource_urls());

        let mut mixed = rule.clone();
        mixed.non_resource_urls.push("/api".to_string());
        assert!(mixed.has_resource_attributes() && mixed.has_non_resource_urls());
    }
}
