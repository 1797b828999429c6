//! Declaration scope of a single stack.

use serde_json::{Value, json};
use std::collections::BTreeSet;
use tracing::debug;

use crate::template::{Output, Resource, Template};
use crate::token::{Reference, Token};
use crate::{Error, LogicalId, Result, StackEnv, StackName};

/// Dynamic reference to the whole `SecretString` of a secret.
const SECRET_PREFIX: &str = "{{resolve:secretsmanager:";
const SECRET_SUFFIX: &str = ":SecretString:::}}";

/// Collects the resources and outputs a stack declares.
///
/// Tokens owned by other stacks are rendered as imports and remembered, so
/// the [`App`](crate::App) can publish the matching exports and order the
/// stacks.
#[derive(Debug)]
pub struct StackScope {
    name: StackName,
    env: StackEnv,
    template: Template,
    imports: BTreeSet<Reference>,
}

impl StackScope {
    pub fn new(name: StackName, env: StackEnv) -> Self {
        Self {
            name,
            env,
            template: Template::default(),
            imports: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &StackName {
        &self.name
    }

    pub fn env(&self) -> &StackEnv {
        &self.env
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn resource_count(&self) -> usize {
        self.template.resources.len()
    }

    /// References to other stacks resolved so far.
    pub fn imports(&self) -> &BTreeSet<Reference> {
        &self.imports
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.template.description = Some(description.into());
    }

    /// Declare a resource under a construct path and return its logical id.
    pub fn add_resource(&mut self, path: &[&str], resource: Resource) -> Result<LogicalId> {
        let id = LogicalId::from_path(path)?;
        if self.template.resources.contains_key(&id) {
            return Err(Error::Duplicate(format!(
                "resource '{}' in stack '{}'",
                path.join("/"),
                self.name
            )));
        }
        debug!(
            stack = %self.name,
            logical_id = %id,
            resource_type = %resource.resource_type,
            "declared resource"
        );
        self.template.resources.insert(id.clone(), resource);
        Ok(id)
    }

    /// Declare a stack output with the given value.
    pub fn add_output(&mut self, id: &str, token: &Token, description: Option<&str>) -> Result<()> {
        let id = LogicalId::new(id)?;
        if self.template.outputs.contains_key(&id) {
            return Err(Error::Duplicate(format!("output '{}' in stack '{}'", id, self.name)));
        }
        let value = self.resolve(token);
        self.template.outputs.insert(
            id,
            Output {
                value,
                description: description.map(str::to_string),
                export: None,
            },
        );
        Ok(())
    }

    /// Token for a resource declared in this stack (`Ref`).
    pub fn reference(&self, id: &LogicalId) -> Token {
        Token::Ref(Reference {
            stack: self.name.clone(),
            target: id.clone(),
            attribute: None,
        })
    }

    /// Token for an attribute of a resource declared in this stack (`Fn::GetAtt`).
    pub fn attribute(&self, id: &LogicalId, attribute: &str) -> Token {
        Token::Ref(Reference {
            stack: self.name.clone(),
            target: id.clone(),
            attribute: Some(attribute.to_string()),
        })
    }

    /// Render a token as template JSON from this stack's point of view.
    pub fn resolve(&mut self, token: &Token) -> Value {
        match token {
            Token::Literal(s) => Value::String(s.clone()),
            Token::Pseudo(p) => json!({ "Ref": p.name() }),
            Token::Ref(r) if r.stack == self.name => match &r.attribute {
                None => json!({ "Ref": r.target }),
                Some(attr) => json!({ "Fn::GetAtt": [r.target, attr] }),
            },
            Token::Ref(r) => {
                if self.imports.insert(r.clone()) {
                    debug!(stack = %self.name, reference = %r, "importing cross-stack reference");
                }
                json!({ "Fn::ImportValue": r.export_name() })
            }
            Token::Secret(secret) => match self.resolve(secret.secret()) {
                Value::String(id) => Value::String(format!("{SECRET_PREFIX}{id}{SECRET_SUFFIX}")),
                other => json!({ "Fn::Join": ["", [SECRET_PREFIX, other, SECRET_SUFFIX]] }),
            },
        }
    }

    /// Concatenate tokens. Collapses to a plain string when every part is a
    /// literal.
    pub fn join(&mut self, parts: &[Token]) -> Value {
        if let Some(joined) = parts
            .iter()
            .map(Token::as_literal)
            .collect::<Option<Vec<_>>>()
        {
            return Value::String(joined.concat());
        }
        let rendered: Vec<Value> = parts.iter().map(|p| self.resolve(p)).collect();
        json!({ "Fn::Join": ["", rendered] })
    }

    pub(crate) fn into_parts(self) -> (StackName, Template, BTreeSet<Reference>) {
        (self.name, self.template, self.imports)
    }
}
