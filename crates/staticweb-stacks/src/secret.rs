//! Placeholder secret for the repository access token.
//!
//! The stack only declares an empty secret. Its value is set out-of-band
//! after deployment:
//!
//! ```text
//! aws secretsmanager put-secret-value --secret-id <GithubTokenArn> --secret-string <token>
//! ```

use serde_json::json;
use staticweb_config::RepositoryConfig;
use staticweb_core::template::{DeletionPolicy, Resource};
use staticweb_core::{GithubCredentials, Result, SecretReference, Stack, StackScope};
use tracing::info;

pub const SECRET_RESOURCE: &str = "githubSecret";
pub const TOKEN_ARN_OUTPUT: &str = "GithubTokenArn";

pub struct SecretStack<'a> {
    repository: &'a RepositoryConfig,
}

impl<'a> SecretStack<'a> {
    pub fn new(repository: &'a RepositoryConfig) -> Self {
        Self { repository }
    }
}

impl Stack for SecretStack<'_> {
    type Output = GithubCredentials;

    fn build(&self, scope: &mut StackScope) -> Result<GithubCredentials> {
        scope.set_description("Placeholder secret holding the source repository access token");

        let secret_id = scope.add_resource(
            &[SECRET_RESOURCE],
            Resource::new("AWS::SecretsManager::Secret")
                .property(
                    "Description",
                    json!(format!(
                        "Access token for {}/{}",
                        self.repository.owner, self.repository.name
                    )),
                )
                .removal_policy(DeletionPolicy::Delete),
        )?;

        let secret_arn = scope.reference(&secret_id);
        scope.add_output(
            TOKEN_ARN_OUTPUT,
            &secret_arn,
            Some(concat!(
                "Set the token with: aws secretsmanager put-secret-value ",
                "--secret-id <this value> --secret-string <token>"
            )),
        )?;

        info!(
            stack = %scope.name(),
            owner = %self.repository.owner,
            repo = %self.repository.name,
            "declared repository token placeholder"
        );

        Ok(GithubCredentials {
            owner: self.repository.owner.clone(),
            repo: self.repository.name.clone(),
            prod_branch: self.repository.prod_branch.clone(),
            dev_branch: self.repository.dev_branch.clone(),
            token: SecretReference::new(secret_arn),
        })
    }
}
