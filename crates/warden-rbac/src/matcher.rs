//! Rule coverage and request matching.
//!
//! # Purpose
//! Decides whether a set of granted rules covers a requested rule (used to
//! prevent privilege escalation) and whether it allows a single request
//! (used by the rule-backed authorizer).
//!
//! # Key invariants
//! - Coverage is evaluated per atomic tuple produced by the cross product of
//!   the candidate's verbs, groups, resources and names. Each tuple needs
//!   one granted rule covering it on its own; different tuples may be covered
//!   by different granted rules.
//! - A candidate `*` is an atomic value of its own: only a granted `*` covers
//!   it, because it also stands for values the granted set never names.
//! - Granted `*/sub` covers any `resource/sub`.
//! - Non-resource paths are covered by an equal pattern, `*`, or a
//!   `prefix*` pattern the path starts with.
use crate::attributes::{AttributesTarget, RequestAttributes, ResourceAttributes};
use crate::rule::{PolicyRule, VERB_ALL};

/// Whether `granted` covers every atomic permission in `candidate`.
pub fn covers(candidate: &PolicyRule, granted: &[PolicyRule]) -> bool {
    atoms(candidate).all(|atom| granted.iter().any(|owner| covers_atom(owner, &atom)))
}

/// Atomic rules that a set of granted rules failed to cover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UncoveredRules {
    /// At most `limit` uncovered atoms, in candidate order.
    pub rules: Vec<PolicyRule>,
    /// More uncovered atoms exist beyond `rules`.
    pub truncated: bool,
}

impl UncoveredRules {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Atomic rules from `candidates` that no rule in `granted` covers.
///
/// Atoms are walked lazily and the walk stops once more than `limit`
/// uncovered atoms are found, so a wide candidate costs no more than the
/// report it produces. Empty means every candidate is covered.
pub fn uncovered_rules(
    candidates: &[PolicyRule],
    granted: &[PolicyRule],
    limit: usize,
) -> UncoveredRules {
    let mut rules: Vec<PolicyRule> = candidates
        .iter()
        .flat_map(atoms)
        .filter(|atom| !granted.iter().any(|owner| covers_atom(owner, atom)))
        .take(limit.saturating_add(1))
        .map(|atom| atom.to_rule())
        .collect();
    let truncated = rules.len() > limit;
    rules.truncate(limit);
    UncoveredRules { rules, truncated }
}

/// Whether any rule in `rules` allows the request described by `attrs`.
pub fn allows(rules: &[PolicyRule], attrs: &RequestAttributes) -> bool {
    rules.iter().any(|rule| rule_allows(rule, attrs))
}

/// Whether the non-resource URL `pattern` (exact, `*`, or `prefix*`) matches `path`.
pub fn non_resource_url_matches(pattern: &str, path: &str) -> bool {
    if pattern == VERB_ALL || pattern == path {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => false,
    }
}

fn rule_allows(rule: &PolicyRule, attrs: &RequestAttributes) -> bool {
    if !contains_or_all(&rule.verbs, &attrs.verb) {
        return false;
    }
    match &attrs.target {
        AttributesTarget::Resource(resource) => resource_allows(rule, resource),
        AttributesTarget::NonResource(non_resource) => rule
            .non_resource_urls
            .iter()
            .any(|pattern| non_resource_url_matches(pattern, &non_resource.path)),
    }
}

fn resource_allows(rule: &PolicyRule, attrs: &ResourceAttributes) -> bool {
    if !contains_or_all(&rule.api_groups, &attrs.api_group) {
        return false;
    }
    if !resource_matches(&rule.resources, &attrs.combined_resource()) {
        return false;
    }
    if rule.resource_names.is_empty() {
        return true;
    }
    match &attrs.name {
        Some(name) => rule.resource_names.iter().any(|allowed| allowed == name),
        None => false,
    }
}

/// One (verb, group, resource, name) or (verb, url) tuple of a rule.
#[derive(Debug, Clone, Copy)]
struct Atom<'a> {
    verb: &'a str,
    target: AtomTarget<'a>,
}

#[derive(Debug, Clone, Copy)]
enum AtomTarget<'a> {
    Resource {
        group: &'a str,
        resource: &'a str,
        // None asks for every name.
        name: Option<&'a str>,
    },
    Url(&'a str),
}

impl Atom<'_> {
    fn to_rule(self) -> PolicyRule {
        let mut rule = PolicyRule {
            verbs: vec![self.verb.to_string()],
            ..PolicyRule::default()
        };
        match self.target {
            AtomTarget::Resource {
                group,
                resource,
                name,
            } => {
                rule.api_groups.push(group.to_string());
                rule.resources.push(resource.to_string());
                rule.resource_names.extend(name.map(str::to_string));
            }
            AtomTarget::Url(url) => rule.non_resource_urls.push(url.to_string()),
        }
        rule
    }
}

/// Lazily split a rule into single-valued atoms along every populated axis.
fn atoms(rule: &PolicyRule) -> impl Iterator<Item = Atom<'_>> + '_ {
    rule.verbs.iter().flat_map(move |verb| {
        let verb = verb.as_str();
        let resources = rule.api_groups.iter().flat_map(move |group| {
            rule.resources.iter().flat_map(move |resource| {
                resource_names(rule).map(move |name| Atom {
                    verb,
                    target: AtomTarget::Resource {
                        group: group.as_str(),
                        resource: resource.as_str(),
                        name,
                    },
                })
            })
        });
        let urls = rule.non_resource_urls.iter().map(move |url| Atom {
            verb,
            target: AtomTarget::Url(url.as_str()),
        });
        resources.chain(urls)
    })
}

fn resource_names(rule: &PolicyRule) -> impl Iterator<Item = Option<&str>> + '_ {
    let unnamed = rule.resource_names.is_empty().then_some(None::<&str>);
    unnamed
        .into_iter()
        .chain(rule.resource_names.iter().map(|name| Some(name.as_str())))
}

fn covers_atom(owner: &PolicyRule, atom: &Atom<'_>) -> bool {
    if !contains_or_all(&owner.verbs, atom.verb) {
        return false;
    }
    let (group, resource, name) = match atom.target {
        AtomTarget::Url(url) => {
            return owner
                .non_resource_urls
                .iter()
                .any(|pattern| non_resource_url_matches(pattern, url));
        }
        AtomTarget::Resource {
            group,
            resource,
            name,
        } => (group, resource, name),
    };
    if !contains_or_all(&owner.api_groups, group) || !resource_matches(&owner.resources, resource)
    {
        return false;
    }
    if owner.resource_names.is_empty() {
        return true;
    }
    match name {
        Some(name) => owner.resource_names.iter().any(|allowed| allowed == name),
        // The candidate asks for every name; a name-restricted grant cannot cover that.
        None => false,
    }
}

fn contains_or_all(values: &[String], value: &str) -> bool {
    values.iter().any(|candidate| candidate == VERB_ALL || candidate == value)
}

fn resource_matches(owner_resources: &[String], resource: &str) -> bool {
    owner_resources.iter().any(|owner| {
        if owner == VERB_ALL || owner == resource {
            return true;
        }
        match (owner.strip_prefix("*/"), resource.split_once('/')) {
            (Some(owner_sub), Some((_, sub))) => owner_sub == sub,
            _ => false,
        }
    })
}
