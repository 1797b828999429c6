//! Value bundles handed from producer stacks to their consumers.
//!
//! A bundle is built once by the stack that owns the underlying resources
//! and is read-only afterwards. Consumers receive it by reference.

use crate::token::{SecretReference, Token};
use crate::{Error, Result};

/// Source repository coordinates plus the deferred access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubCredentials {
    pub owner: String,
    pub repo: String,
    pub prod_branch: String,
    pub dev_branch: String,
    pub token: SecretReference,
}

impl GithubCredentials {
    /// Fail on the first empty field.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("owner", &self.owner),
            ("repo", &self.repo),
            ("prod_branch", &self.prod_branch),
            ("dev_branch", &self.dev_branch),
        ] {
            if value.trim().is_empty() {
                return Err(Error::MissingField(format!("github credentials {field}")));
            }
        }
        if self.token.secret().is_empty() {
            return Err(Error::MissingField("github credentials token".to_string()));
        }
        Ok(())
    }
}

/// Identity endpoints a client application needs to sign users in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CognitoAuthConfig {
    pub user_pool_id: Token,
    pub user_pool_client_id: Token,
    pub identity_pool_id: Token,
    pub region: Token,
}

impl CognitoAuthConfig {
    /// Fields in their canonical order.
    pub fn fields(&self) -> [(&'static str, &Token); 4] {
        [
            ("user_pool_id", &self.user_pool_id),
            ("user_pool_client_id", &self.user_pool_client_id),
            ("identity_pool_id", &self.identity_pool_id),
            ("region", &self.region),
        ]
    }

    /// Fail on the first empty field.
    pub fn validate(&self) -> Result<()> {
        match self.fields().into_iter().find(|(_, token)| token.is_empty()) {
            Some((field, _)) => Err(Error::MissingField(format!("cognito auth config {field}"))),
            None => Ok(()),
        }
    }
}

/// Identity endpoints gathered from a source that may lack some of them.
///
/// Only useful as an intermediate: convert it with `try_into` before handing
/// it to a stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialCognitoAuthConfig {
    pub user_pool_id: Option<Token>,
    pub user_pool_client_id: Option<Token>,
    pub identity_pool_id: Option<Token>,
    pub region: Option<Token>,
}

impl TryFrom<PartialCognitoAuthConfig> for CognitoAuthConfig {
    type Error = Error;

    fn try_from(partial: PartialCognitoAuthConfig) -> Result<Self> {
        fn require(value: Option<Token>, field: &str) -> Result<Token> {
            value
                .filter(|t| !t.is_empty())
                .ok_or_else(|| Error::MissingField(format!("cognito auth config {field}")))
        }

        Ok(Self {
            user_pool_id: require(partial.user_pool_id, "user_pool_id")?,
            user_pool_client_id: require(partial.user_pool_client_id, "user_pool_client_id")?,
            identity_pool_id: require(partial.identity_pool_id, "identity_pool_id")?,
            region: require(partial.region, "region")?,
        })
    }
}
