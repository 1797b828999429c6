//! Deployment template types.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::LogicalId;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// What happens to a resource when it is removed from the template or replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
    Snapshot,
}

impl std::fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletionPolicy::Delete => write!(f, "Delete"),
            DeletionPolicy::Retain => write!(f, "Retain"),
            DeletionPolicy::Snapshot => write!(f, "Snapshot"),
        }
    }
}

/// A declared resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: Map::new(),
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn depends_on(mut self, id: LogicalId) -> Self {
        if !self.depends_on.contains(&id) {
            self.depends_on.push(id);
        }
        self
    }

    /// Set both the deletion and the update-replace policy.
    pub fn removal_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self.update_replace_policy = Some(policy);
        self
    }
}

/// A named export of an output value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    pub name: String,
}

/// A stack output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
}

/// The template of a single stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub resources: BTreeMap<LogicalId, Resource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<LogicalId, Output>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: None,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }
}

impl Template {
    /// All resources of the given type, in logical-id order.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &str,
    ) -> impl Iterator<Item = (&'a LogicalId, &'a Resource)> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    /// The single resource of a type. `None` when there are zero or several.
    pub fn single_resource_of_type(&self, resource_type: &str) -> Option<(&LogicalId, &Resource)> {
        let mut iter = self.resources_of_type(resource_type);
        let first = iter.next()?;
        match iter.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    pub fn output(&self, id: &str) -> Option<&Output> {
        self.outputs.iter().find(|(k, _)| k.as_str() == id).map(|(_, o)| o)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_serializes_in_deployment_shape() {
        let mut template = Template {
            description: Some("test".to_string()),
            ..Default::default()
        };
        let id = LogicalId::new("Secret").unwrap();
        template.resources.insert(
            id.clone(),
            Resource::new("AWS::SecretsManager::Secret")
                .property("Description", json!("placeholder"))
                .removal_policy(DeletionPolicy::Delete),
        );
        template.outputs.insert(
            LogicalId::new("SecretArn").unwrap(),
            Output {
                value: json!({ "Ref": "Secret" }),
                description: None,
                export: None,
            },
        );

        let value = serde_json::to_value(&template).unwrap();
        assert_eq!(
            value,
            json!({
                "AWSTemplateFormatVersion": "2010-09-09",
                "Description": "test",
                "Resources": {
                    "Secret": {
                        "Type": "AWS::SecretsManager::Secret",
                        "Properties": { "Description": "placeholder" },
                        "DeletionPolicy": "Delete",
                        "UpdateReplacePolicy": "Delete"
                    }
                },
                "Outputs": {
                    "SecretArn": { "Value": { "Ref": "Secret" } }
                }
            })
        );
    }

    #[test]
    fn test_empty_properties_are_omitted() {
        let value = serde_json::to_value(Resource::new("AWS::Test::Thing")).unwrap();
        assert_eq!(value, json!({ "Type": "AWS::Test::Thing" }));
    }

    #[test]
    fn test_depends_on_deduplicates() {
        let id = LogicalId::new("Role").unwrap();
        let resource = Resource::new("AWS::Test::Thing")
            .depends_on(id.clone())
            .depends_on(id);
        assert_eq!(resource.depends_on.len(), 1);
    }

    #[test]
    fn test_single_resource_of_type() {
        let mut template = Template::default();
        template
            .resources
            .insert(LogicalId::new("A").unwrap(), Resource::new("AWS::IAM::Role"));
        assert!(template.single_resource_of_type("AWS::IAM::Role").is_some());
        template
            .resources
            .insert(LogicalId::new("B").unwrap(), Resource::new("AWS::IAM::Role"));
        assert!(template.single_resource_of_type("AWS::IAM::Role").is_none());
        assert!(template.single_resource_of_type("AWS::Amplify::App").is_none());
    }
}
