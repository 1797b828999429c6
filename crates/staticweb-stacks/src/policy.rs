//! IAM policy documents for role trust relationships.

use serde_json::{Map, Value, json};
use staticweb_core::{Error, Result, StackScope, Token};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const COGNITO_IDENTITY_PRINCIPAL: &str = "cognito-identity.amazonaws.com";
pub const ASSUME_ROLE_WITH_WEB_IDENTITY: &str = "sts:AssumeRoleWithWebIdentity";

const CONDITION_OPERATORS: &[&str] = &[
    "StringEquals",
    "StringNotEquals",
    "StringEqualsIgnoreCase",
    "StringNotEqualsIgnoreCase",
    "StringLike",
    "StringNotLike",
    "ArnEquals",
    "ArnLike",
    "ArnNotEquals",
    "ArnNotLike",
    "Bool",
    "Null",
];

/// Authentication state a federated caller presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

impl AuthState {
    /// Value of the `amr` claim for this state.
    pub fn amr(&self) -> &'static str {
        match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::Authenticated => "authenticated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Federated(String),
    Service(String),
}

/// One condition block entry, e.g. `StringEquals: { key: value }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub operator: String,
    pub key: String,
    pub values: Vec<Token>,
}

impl Condition {
    pub fn new(operator: impl Into<String>, key: impl Into<String>, value: Token) -> Self {
        Self {
            operator: operator.into(),
            key: key.into(),
            values: vec![value],
        }
    }

    fn validate(&self) -> Result<()> {
        let base = self
            .operator
            .strip_prefix("ForAnyValue:")
            .or_else(|| self.operator.strip_prefix("ForAllValues:"))
            .unwrap_or(&self.operator);
        let base = base.strip_suffix("IfExists").unwrap_or(base);
        if !CONDITION_OPERATORS.contains(&base) {
            return Err(Error::InvalidPolicy(format!(
                "unknown condition operator '{}'",
                self.operator
            )));
        }
        if self.key.trim().is_empty() {
            return Err(Error::InvalidPolicy(format!(
                "condition '{}' has an empty key",
                self.operator
            )));
        }
        if self.values.is_empty() || self.values.iter().any(Token::is_empty) {
            return Err(Error::InvalidPolicy(format!(
                "condition '{} {}' needs non-empty values",
                self.operator, self.key
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub principal: Principal,
    pub actions: Vec<String>,
    pub conditions: Vec<Condition>,
}

impl PolicyStatement {
    fn validate(&self) -> Result<()> {
        if self.actions.is_empty() || self.actions.iter().any(|a| a.trim().is_empty()) {
            return Err(Error::InvalidPolicy("statement needs at least one action".to_string()));
        }
        for (i, condition) in self.conditions.iter().enumerate() {
            condition.validate()?;
            if self.conditions[..i]
                .iter()
                .any(|c| c.operator == condition.operator && c.key == condition.key)
            {
                return Err(Error::InvalidPolicy(format!(
                    "condition '{} {}' declared twice",
                    condition.operator, condition.key
                )));
            }
        }
        Ok(())
    }

    fn render(&self, scope: &mut StackScope) -> Value {
        let principal = match &self.principal {
            Principal::Federated(p) => json!({ "Federated": p }),
            Principal::Service(p) => json!({ "Service": p }),
        };
        let action = match self.actions.as_slice() {
            [single] => json!(single),
            many => json!(many),
        };

        let mut statement = Map::new();
        statement.insert("Action".to_string(), action);
        if !self.conditions.is_empty() {
            let mut blocks: Map<String, Value> = Map::new();
            for condition in &self.conditions {
                let values: Vec<Value> =
                    condition.values.iter().map(|v| scope.resolve(v)).collect();
                let value = match <[Value; 1]>::try_from(values) {
                    Ok([single]) => single,
                    Err(many) => Value::Array(many),
                };
                let block = blocks
                    .entry(condition.operator.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(block) = block {
                    block.insert(condition.key.clone(), value);
                }
            }
            statement.insert("Condition".to_string(), Value::Object(blocks));
        }
        statement.insert("Effect".to_string(), json!(self.effect.as_str()));
        statement.insert("Principal".to_string(), principal);
        Value::Object(statement)
    }
}

/// A policy document. Validated when rendered into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Trust policy letting identities of `identity_pool` in `state` assume
    /// the role, and nobody else.
    pub fn cognito_trust(identity_pool: Token, state: AuthState) -> Self {
        Self {
            statements: vec![PolicyStatement {
                effect: Effect::Allow,
                principal: Principal::Federated(COGNITO_IDENTITY_PRINCIPAL.to_string()),
                actions: vec![ASSUME_ROLE_WITH_WEB_IDENTITY.to_string()],
                conditions: vec![
                    Condition::new(
                        "StringEquals",
                        format!("{COGNITO_IDENTITY_PRINCIPAL}:aud"),
                        identity_pool,
                    ),
                    Condition::new(
                        "ForAnyValue:StringLike",
                        format!("{COGNITO_IDENTITY_PRINCIPAL}:amr"),
                        Token::literal(state.amr()),
                    ),
                ],
            }],
        }
    }

    /// Trust policy for a managed service principal.
    pub fn service_trust(service: &str) -> Self {
        Self {
            statements: vec![PolicyStatement {
                effect: Effect::Allow,
                principal: Principal::Service(service.to_string()),
                actions: vec!["sts:AssumeRole".to_string()],
                conditions: Vec::new(),
            }],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.statements.is_empty() {
            return Err(Error::InvalidPolicy("policy has no statements".to_string()));
        }
        self.statements.iter().try_for_each(PolicyStatement::validate)
    }

    pub fn render(&self, scope: &mut StackScope) -> Result<Value> {
        self.validate()?;
        let statements: Vec<Value> = self.statements.iter().map(|s| s.render(scope)).collect();
        Ok(json!({
            "Statement": statements,
            "Version": POLICY_VERSION,
        }))
    }
}
