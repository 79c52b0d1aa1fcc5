use crate::subject::UserInfo;
use serde::{Deserialize, Serialize};

/// A single authorization question: may `user` perform this action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAttributes {
    pub user: UserInfo,
    pub verb: String,
    pub target: AttributesTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributesTarget {
    Resource(ResourceAttributes),
    NonResource(NonResourceAttributes),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttributes {
    pub api_group: String,
    pub resource: String,
    pub subresource: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonResourceAttributes {
    pub path: String,
}

impl RequestAttributes {
    pub fn resource(user: UserInfo, verb: impl Into<String>, resource: ResourceAttributes) -> Self {
        Self {
            user,
            verb: verb.into(),
            target: AttributesTarget::Resource(resource),
        }
    }

    pub fn non_resource(user: UserInfo, verb: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            user,
            verb: verb.into(),
            target: AttributesTarget::NonResource(NonResourceAttributes { path: path.into() }),
        }
    }

    /// Namespace the question is asked in, if any.
    pub fn namespace(&self) -> Option<&str> {
        match &self.target {
            AttributesTarget::Resource(resource) => resource.namespace.as_deref(),
            AttributesTarget::NonResource(_) => None,
        }
    }
}

impl ResourceAttributes {
    pub fn new(api_group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            api_group: api_group.into(),
            resource: resource.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn in_namespace(mut self, namespace: Option<&str>) -> Self {
        self.namespace = namespace.map(str::to_string);
        self
    }

    /// `resource` or `resource/subresource`, the form rules are written in.
    pub fn combined_resource(&self) -> String {
        match &self.subresource {
            Some(sub) => format!("{}/{}", self.resource, sub),
            None => self.resource.clone(),
        }
    }
}
