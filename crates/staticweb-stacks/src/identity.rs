//! Federated identity: user pool, client, identity pool and trust roles.
//!
//! Signed-out callers and signed-in callers get separate roles. Each role's
//! trust policy matches only this identity pool and only one authentication
//! state, so the privilege boundary can be read straight off the template.

use serde_json::json;
use staticweb_config::IdentityConfig;
use staticweb_core::template::{DeletionPolicy, Resource};
use staticweb_core::{
    CognitoAuthConfig, LogicalId, PseudoParameter, Result, Stack, StackScope, Token,
};
use tracing::info;

use crate::policy::{AuthState, PolicyDocument};

/// Managed policy granted to both trust roles.
pub const BASELINE_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";

pub const USER_POOL_ID_OUTPUT: &str = "UserPoolId";
pub const USER_POOL_CLIENT_ID_OUTPUT: &str = "UserPoolClientId";
pub const IDENTITY_POOL_ID_OUTPUT: &str = "IdentityPoolId";
pub const REGION_OUTPUT: &str = "Region";

pub struct IdentityStack<'a> {
    settings: &'a IdentityConfig,
}

impl<'a> IdentityStack<'a> {
    pub fn new(settings: &'a IdentityConfig) -> Self {
        Self { settings }
    }

    fn declare_user_pool(&self, scope: &mut StackScope) -> Result<LogicalId> {
        scope.add_resource(
            &["UserPool"],
            Resource::new("AWS::Cognito::UserPool")
                .property("UserPoolName", json!(self.settings.user_pool_name))
                .property(
                    "AdminCreateUserConfig",
                    json!({ "AllowAdminCreateUserOnly": false }),
                )
                .property("AliasAttributes", json!(["email"]))
                .property("AutoVerifiedAttributes", json!(["email"]))
                .property(
                    "AccountRecoverySetting",
                    json!({
                        "RecoveryMechanisms": [{ "Name": "verified_email", "Priority": 1 }]
                    }),
                )
                .property(
                    "VerificationMessageTemplate",
                    json!({
                        "DefaultEmailOption": "CONFIRM_WITH_CODE",
                        "EmailMessage": "The verification code to your new account is {####}",
                        "EmailSubject": "Verify your new account",
                    }),
                )
                .removal_policy(DeletionPolicy::Delete),
        )
    }

    fn declare_trust_role(
        &self,
        scope: &mut StackScope,
        name: &str,
        identity_pool: &Token,
        state: AuthState,
    ) -> Result<LogicalId> {
        let trust = PolicyDocument::cognito_trust(identity_pool.clone(), state).render(scope)?;
        let baseline = scope.join(&[
            Token::literal("arn:"),
            Token::Pseudo(PseudoParameter::Partition),
            Token::literal(format!(":iam::aws:policy/{BASELINE_POLICY}")),
        ]);

        scope.add_resource(
            &[name],
            Resource::new("AWS::IAM::Role")
                .property("AssumeRolePolicyDocument", trust)
                .property(
                    "Description",
                    json!(format!("Role assumed by {} identities", state.amr())),
                )
                .property("ManagedPolicyArns", json!([baseline])),
        )
    }
}

impl Stack for IdentityStack<'_> {
    type Output = CognitoAuthConfig;

    fn build(&self, scope: &mut StackScope) -> Result<CognitoAuthConfig> {
        scope.set_description("User pool, identity pool and trust roles for the static website");

        let user_pool = self.declare_user_pool(scope)?;
        let user_pool_ref = scope.reference(&user_pool);

        let pool_id = scope.resolve(&user_pool_ref);
        let client = scope.add_resource(
            &["UserPoolClient"],
            Resource::new("AWS::Cognito::UserPoolClient")
                .property("UserPoolId", pool_id)
                .property("ClientName", json!(self.settings.client_name))
                .property("GenerateSecret", json!(self.settings.generate_secret))
                .property("SupportedIdentityProviders", json!(["COGNITO"])),
        )?;
        let client_ref = scope.reference(&client);

        let client_id = scope.resolve(&client_ref);
        let provider_name = scope.attribute(&user_pool, "ProviderName");
        let provider_name = scope.resolve(&provider_name);
        let identity_pool = scope.add_resource(
            &["IdentityPool"],
            Resource::new("AWS::Cognito::IdentityPool")
                .property("AllowUnauthenticatedIdentities", json!(true))
                .property(
                    "CognitoIdentityProviders",
                    json!([{ "ClientId": client_id, "ProviderName": provider_name }]),
                ),
        )?;
        let identity_pool_ref = scope.reference(&identity_pool);

        let anonymous = self.declare_trust_role(
            scope,
            "AnonymousRole",
            &identity_pool_ref,
            AuthState::Unauthenticated,
        )?;
        let authenticated = self.declare_trust_role(
            scope,
            "AuthenticatedRole",
            &identity_pool_ref,
            AuthState::Authenticated,
        )?;

        let provider = scope.join(&[
            Token::literal("cognito-idp."),
            Token::Pseudo(PseudoParameter::Region),
            Token::literal(".amazonaws.com/"),
            user_pool_ref.clone(),
            Token::literal(":"),
            client_ref.clone(),
        ]);
        let identity_pool_id = scope.resolve(&identity_pool_ref);
        let authenticated_arn = scope.attribute(&authenticated, "Arn");
        let authenticated_arn = scope.resolve(&authenticated_arn);
        let anonymous_arn = scope.attribute(&anonymous, "Arn");
        let anonymous_arn = scope.resolve(&anonymous_arn);
        scope.add_resource(
            &["IdentityPoolRoleAttachment"],
            Resource::new("AWS::Cognito::IdentityPoolRoleAttachment")
                .property("IdentityPoolId", identity_pool_id)
                .property(
                    "Roles",
                    json!({
                        "authenticated": authenticated_arn,
                        "unauthenticated": anonymous_arn,
                    }),
                )
                .property(
                    "RoleMappings",
                    json!({
                        "cognito-user-pool": {
                            "Type": "Token",
                            "AmbiguousRoleResolution": "AuthenticatedRole",
                            "IdentityProvider": provider,
                        }
                    }),
                ),
        )?;

        let auth = CognitoAuthConfig {
            user_pool_id: user_pool_ref,
            user_pool_client_id: client_ref,
            identity_pool_id: identity_pool_ref,
            region: Token::literal(scope.env().region.clone()),
        };

        scope.add_output(USER_POOL_ID_OUTPUT, &auth.user_pool_id, None)?;
        scope.add_output(USER_POOL_CLIENT_ID_OUTPUT, &auth.user_pool_client_id, None)?;
        scope.add_output(IDENTITY_POOL_ID_OUTPUT, &auth.identity_pool_id, None)?;
        scope.add_output(REGION_OUTPUT, &auth.region, None)?;

        info!(
            stack = %scope.name(),
            region = %scope.env().region,
            region_source = %scope.env().region_source,
            "declared identity resources"
        );
        Ok(auth)
    }
}
