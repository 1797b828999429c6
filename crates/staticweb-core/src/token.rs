//! Tokens: values that end up in a template.
//!
//! A token is either known at definition time (a literal) or resolved later
//! by the deployment engine (a reference to another resource, a pseudo
//! parameter, or a secret). Tokens are rendered into template JSON by the
//! [`StackScope`](crate::StackScope) of the stack that consumes them.

use std::fmt;

use crate::{LogicalId, StackName};

/// A value placed into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A plain string known at definition time.
    Literal(String),
    /// A resource in some stack (`Ref`) or one of its attributes (`Fn::GetAtt`).
    Ref(Reference),
    /// A value supplied by the deployment engine.
    Pseudo(PseudoParameter),
    /// A secret value resolved at deploy time.
    Secret(SecretReference),
}

impl Token {
    pub fn literal(value: impl Into<String>) -> Self {
        Token::Literal(value.into())
    }

    /// True for a blank literal. Every non-literal token resolves to a value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Token::Literal(s) if s.trim().is_empty())
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Token::Literal(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Literal(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Literal(value)
    }
}

impl From<Reference> for Token {
    fn from(value: Reference) -> Self {
        Token::Ref(value)
    }
}

/// A resource, or one attribute of it, declared in a named stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reference {
    pub stack: StackName,
    pub target: LogicalId,
    pub attribute: Option<String>,
}

impl Reference {
    /// Name of the output that exports this reference from its stack.
    pub fn export_output_id(&self) -> String {
        match &self.attribute {
            None => format!("ExportsOutputRef{}", self.target),
            Some(attr) => {
                let attr: String = attr.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
                format!("ExportsOutputFnGetAtt{}{}", self.target, attr)
            }
        }
    }

    /// Globally unique export name.
    pub fn export_name(&self) -> String {
        format!("{}:{}", self.stack, self.export_output_id())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            None => write!(f, "{}/{}", self.stack, self.target),
            Some(attr) => write!(f, "{}/{}.{}", self.stack, self.target, attr),
        }
    }
}

/// Values the deployment engine knows about the target environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoParameter {
    Region,
    Partition,
    AccountId,
}

impl PseudoParameter {
    pub fn name(&self) -> &'static str {
        match self {
            PseudoParameter::Region => "AWS::Region",
            PseudoParameter::Partition => "AWS::Partition",
            PseudoParameter::AccountId => "AWS::AccountId",
        }
    }
}

/// Deferred reference to a value held in the secret store.
///
/// Holds the secret's identity, never its value. Renders as a dynamic
/// reference the deployment engine resolves when it applies the template.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretReference {
    secret: Box<Token>,
}

impl SecretReference {
    /// Reference the whole `SecretString` of the secret identified by `secret`
    /// (a name or ARN).
    pub fn new(secret: impl Into<Token>) -> Self {
        Self {
            secret: Box::new(secret.into()),
        }
    }

    pub fn secret(&self) -> &Token {
        &self.secret
    }
}

impl fmt::Debug for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretReference(<redacted>)")
    }
}
