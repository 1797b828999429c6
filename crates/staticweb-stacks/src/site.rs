//! Hosted build pipeline for the static site.
//!
//! Consumes the repository credentials and the identity endpoints. Both
//! bundles are validated before anything is declared, so a bad input never
//! leaves a half-built stack behind.

use serde_json::{Value, json};
use staticweb_config::SiteConfig;
use staticweb_core::template::Resource;
use staticweb_core::{
    CognitoAuthConfig, Error, GithubCredentials, LogicalId, Result, Stack, StackScope, Token,
};
use tracing::{debug, info};
use url::Url;

use crate::buildspec::BuildSpec;
use crate::domain::{BranchRole, SubdomainMapping, plan_subdomains};
use crate::policy::PolicyDocument;

pub const AMPLIFY_SERVICE: &str = "amplify.amazonaws.com";
pub const SITE_URL_OUTPUT: &str = "SiteUrl";

/// Rewrite every path that does not look like a static asset to the index
/// document.
pub const SPA_REDIRECT_SOURCE: &str =
    "</^[^.]+$|\\.(?!(css|gif|ico|jpg|js|png|txt|svg|woff|ttf|map|json)$)([^.]+$)/>";
pub const SPA_REDIRECT_TARGET: &str = "/index.html";
pub const SPA_REDIRECT_STATUS: &str = "200";

/// Environment variable names, without prefix, in the order of
/// [`CognitoAuthConfig::fields`].
pub const ENVIRONMENT_KEYS: [&str; 4] = [
    "USER_POOL_ID",
    "USER_POOL_CLIENT_ID",
    "IDENTITY_POOL_ID",
    "COGNITO_REGION",
];

/// Build-time environment derived from the identity endpoints.
pub fn build_environment(auth: &CognitoAuthConfig, prefix: &str) -> Vec<(String, Token)> {
    ENVIRONMENT_KEYS
        .iter()
        .zip(auth.fields())
        .map(|(key, (_, token))| (format!("{prefix}{key}"), token.clone()))
        .collect()
}

/// What the site stack exposes after it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteOutputs {
    pub app_id: Token,
    pub default_domain: Token,
    pub subdomains: Vec<SubdomainMapping>,
}

pub struct SiteStack<'a> {
    app_name: &'a str,
    credentials: &'a GithubCredentials,
    auth: &'a CognitoAuthConfig,
    settings: &'a SiteConfig,
}

impl<'a> SiteStack<'a> {
    pub fn new(
        app_name: &'a str,
        credentials: &'a GithubCredentials,
        auth: &'a CognitoAuthConfig,
        settings: &'a SiteConfig,
    ) -> Self {
        Self {
            app_name,
            credentials,
            auth,
            settings,
        }
    }

    fn repository_url(&self) -> Result<Url> {
        let raw = format!(
            "https://github.com/{}/{}",
            self.credentials.owner, self.credentials.repo
        );
        Url::parse(&raw).map_err(|e| Error::invalid_value("repository", format!("{raw}: {e}")))
    }

    fn declare_branch(
        &self,
        scope: &mut StackScope,
        app_id: &Value,
        branch: &str,
    ) -> Result<LogicalId> {
        scope.add_resource(
            &["StaticWebApp", "Branches", branch],
            Resource::new("AWS::Amplify::Branch")
                .property("AppId", app_id.clone())
                .property("BranchName", json!(branch))
                .property("EnableAutoBuild", json!(true)),
        )
    }
}

impl Stack for SiteStack<'_> {
    type Output = SiteOutputs;

    fn build(&self, scope: &mut StackScope) -> Result<SiteOutputs> {
        if self.app_name.trim().is_empty() {
            return Err(Error::MissingField("app name".to_string()));
        }
        self.credentials.validate()?;
        self.auth.validate()?;
        let subdomains =
            plan_subdomains(&self.credentials.prod_branch, &self.credentials.dev_branch)?;
        let repository = self.repository_url()?;
        let environment = build_environment(self.auth, &self.settings.env_prefix);
        let env_keys: Vec<&str> = environment.iter().map(|(k, _)| k.as_str()).collect();
        let build_spec = BuildSpec::for_site(self.settings, &env_keys).to_yaml()?;

        scope.set_description("Hosted build pipeline, branches and domain for the static website");

        let trust = PolicyDocument::service_trust(AMPLIFY_SERVICE).render(scope)?;
        let role = scope.add_resource(
            &["StaticWebApp", "Role"],
            Resource::new("AWS::IAM::Role").property("AssumeRolePolicyDocument", trust),
        )?;
        let role_arn = scope.attribute(&role, "Arn");
        let role_arn = scope.resolve(&role_arn);

        let oauth_token = scope.resolve(&Token::Secret(self.credentials.token.clone()));
        let variables: Vec<Value> = environment
            .iter()
            .map(|(name, token)| json!({ "Name": name, "Value": scope.resolve(token) }))
            .collect();

        let mut app = Resource::new("AWS::Amplify::App")
            .property("Name", json!(self.app_name))
            .property("Repository", json!(repository.as_str()))
            .property("OauthToken", oauth_token)
            .property("EnvironmentVariables", Value::Array(variables))
            .property(
                "CustomRules",
                json!([{
                    "Source": SPA_REDIRECT_SOURCE,
                    "Target": SPA_REDIRECT_TARGET,
                    "Status": SPA_REDIRECT_STATUS,
                }]),
            )
            .property("EnableBranchAutoDeletion", json!(true))
            .property("BuildSpec", json!(build_spec))
            .property("IAMServiceRole", role_arn.clone())
            .property("Platform", json!("WEB"));
        if !self.settings.auto_branch_patterns.is_empty() {
            app = app.property(
                "AutoBranchCreationConfig",
                json!({
                    "EnableAutoBranchCreation": true,
                    "EnableAutoBuild": true,
                    "AutoBranchCreationPatterns": self.settings.auto_branch_patterns,
                }),
            );
        }
        let app = scope.add_resource(&["StaticWebApp"], app)?;

        let app_id_token = scope.attribute(&app, "AppId");
        let app_id = scope.resolve(&app_id_token);

        let prod = self.declare_branch(scope, &app_id, &self.credentials.prod_branch)?;
        let dev = self.declare_branch(scope, &app_id, &self.credentials.dev_branch)?;

        let mut settings = Vec::with_capacity(subdomains.len());
        for mapping in &subdomains {
            let branch = match mapping.role {
                BranchRole::Production => &prod,
                BranchRole::Development => &dev,
            };
            let branch_name = scope.attribute(branch, "BranchName");
            settings.push(json!({
                "BranchName": scope.resolve(&branch_name),
                "Prefix": mapping.prefix,
            }));
            debug!(
                branch = %mapping.branch,
                prefix = %mapping.prefix,
                domain = %self.settings.domain,
                "mapped subdomain"
            );
        }

        let patterns = &self.settings.auto_subdomain_patterns;
        let mut domain = Resource::new("AWS::Amplify::Domain")
            .property("AppId", app_id)
            .property("DomainName", json!(self.settings.domain))
            .property("SubDomainSettings", Value::Array(settings))
            .property("EnableAutoSubDomain", json!(!patterns.is_empty()));
        if !patterns.is_empty() {
            domain = domain
                .property("AutoSubDomainCreationPatterns", json!(patterns))
                .property("AutoSubDomainIAMRole", role_arn);
        }
        scope.add_resource(
            &["StaticWebApp", "Domains", self.settings.domain.as_str()],
            domain.depends_on(prod).depends_on(dev),
        )?;

        let default_domain = scope.attribute(&app, "DefaultDomain");
        scope.add_output(SITE_URL_OUTPUT, &default_domain, None)?;

        info!(
            stack = %scope.name(),
            repository = %repository,
            domain = %self.settings.domain,
            prod_branch = %self.credentials.prod_branch,
            dev_branch = %self.credentials.dev_branch,
            "declared site resources"
        );

        Ok(SiteOutputs {
            app_id: app_id_token,
            default_domain,
            subdomains,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staticweb_core::template::Template;
    use staticweb_core::{SecretReference, StackEnv, StackName};

    fn credentials() -> GithubCredentials {
        GithubCredentials {
            owner: "egochao".to_string(),
            repo: "simple_gatsby_blog".to_string(),
            prod_branch: "master".to_string(),
            dev_branch: "develop".to_string(),
            token: SecretReference::new("github-token"),
        }
    }

    fn auth() -> CognitoAuthConfig {
        CognitoAuthConfig {
            user_pool_id: Token::literal("us-east-1_AbCdEf"),
            user_pool_client_id: Token::literal("4l7bq0ef1c2client"),
            identity_pool_id: Token::literal("us-east-1:0000-1111"),
            region: Token::literal("us-east-1"),
        }
    }

    fn scope() -> StackScope {
        StackScope::new(
            StackName::new("StaticWebStack").unwrap(),
            StackEnv::resolve(Some("us-east-1"), None),
        )
    }

    fn build(auth: &CognitoAuthConfig) -> Result<(StackScope, SiteOutputs)> {
        let creds = credentials();
        let settings = SiteConfig::default();
        let mut scope = scope();
        let outputs = SiteStack::new("simple-static-website", &creds, auth, &settings)
            .build(&mut scope)?;
        Ok((scope, outputs))
    }

    fn app_resource(template: &Template) -> &Resource {
        template.single_resource_of_type("AWS::Amplify::App").unwrap().1
    }

    #[test]
    fn test_environment_variables_match_bundle() {
        let auth = auth();
        let (scope, _) = build(&auth).unwrap();
        let app = app_resource(scope.template());
        assert_eq!(
            app.properties["EnvironmentVariables"],
            json!([
                { "Name": "GATSBY_USER_POOL_ID", "Value": "us-east-1_AbCdEf" },
                { "Name": "GATSBY_USER_POOL_CLIENT_ID", "Value": "4l7bq0ef1c2client" },
                { "Name": "GATSBY_IDENTITY_POOL_ID", "Value": "us-east-1:0000-1111" },
                { "Name": "GATSBY_COGNITO_REGION", "Value": "us-east-1" },
            ])
        );
    }

    #[test]
    fn test_build_environment_is_deterministic() {
        let auth = auth();
        assert_eq!(
            build_environment(&auth, "GATSBY_"),
            build_environment(&auth, "GATSBY_")
        );
        let env = build_environment(&auth, "VITE_");
        let keys: Vec<&str> = env.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "VITE_USER_POOL_ID",
                "VITE_USER_POOL_CLIENT_ID",
                "VITE_IDENTITY_POOL_ID",
                "VITE_COGNITO_REGION"
            ]
        );
    }

    #[test]
    fn test_incomplete_bundle_declares_nothing() {
        let mut auth = auth();
        auth.user_pool_client_id = Token::literal("");
        let creds = credentials();
        let settings = SiteConfig::default();
        let mut scope = scope();

        let err = SiteStack::new("simple-static-website", &creds, &auth, &settings)
            .build(&mut scope)
            .unwrap_err();
        assert!(matches!(&err, Error::MissingField(f) if f.ends_with("user_pool_client_id")));
        assert_eq!(scope.resource_count(), 0);
        assert!(scope.imports().is_empty());
    }

    #[test]
    fn test_bad_dev_branch_declares_nothing() {
        let mut creds = credentials();
        creds.dev_branch = "feature/x".to_string();
        let auth = auth();
        let settings = SiteConfig::default();
        let mut scope = scope();

        let result = SiteStack::new("simple-static-website", &creds, &auth, &settings)
            .build(&mut scope);
        assert!(matches!(result, Err(Error::InvalidValue { .. })));
        assert_eq!(scope.resource_count(), 0);
    }

    #[test]
    fn test_app_wiring() {
        let (scope, _) = build(&auth()).unwrap();
        let app = app_resource(scope.template());
        assert_eq!(
            app.properties["Repository"],
            "https://github.com/egochao/simple_gatsby_blog"
        );
        assert_eq!(
            app.properties["OauthToken"],
            "{{resolve:secretsmanager:github-token:SecretString:::}}"
        );
        assert_eq!(
            app.properties["CustomRules"][0]["Target"],
            SPA_REDIRECT_TARGET
        );
        assert_eq!(app.properties["CustomRules"][0]["Status"], "200");
        assert_eq!(
            app.properties["AutoBranchCreationConfig"]["AutoBranchCreationPatterns"],
            json!(["feature/*", "test/*"])
        );
        assert_eq!(app.properties["EnableBranchAutoDeletion"], true);
    }

    #[test]
    fn test_build_spec_embedded() {
        let (scope, _) = build(&auth()).unwrap();
        let app = app_resource(scope.template());
        let spec = app.properties["BuildSpec"].as_str().unwrap();
        assert!(spec.contains("echo GATSBY_COGNITO_REGION=$GATSBY_COGNITO_REGION >> .env"));
        assert!(spec.contains("npm run build"));
        assert!(spec.contains("baseDirectory: public"));
    }

    #[test]
    fn test_branches_and_domain_mapping() {
        let (scope, outputs) = build(&auth()).unwrap();
        let template = scope.template();

        let branches: Vec<(&LogicalId, &str)> = template
            .resources_of_type("AWS::Amplify::Branch")
            .map(|(id, r)| (id, r.properties["BranchName"].as_str().unwrap()))
            .collect();
        assert_eq!(branches.len(), 2);
        let branch_id = |name: &str| {
            branches
                .iter()
                .find(|(_, n)| *n == name)
                .map(|(id, _)| id.as_str())
                .unwrap()
        };
        let prod = branch_id("master");
        let dev = branch_id("develop");

        let (_, domain) = template.single_resource_of_type("AWS::Amplify::Domain").unwrap();
        assert_eq!(domain.properties["DomainName"], "ctablog.net");
        assert_eq!(domain.properties["EnableAutoSubDomain"], true);
        assert_eq!(
            domain.properties["AutoSubDomainCreationPatterns"],
            json!(["*", "pr*"])
        );
        assert_eq!(
            domain.properties["SubDomainSettings"],
            json!([
                { "BranchName": { "Fn::GetAtt": [prod, "BranchName"] }, "Prefix": "" },
                { "BranchName": { "Fn::GetAtt": [prod, "BranchName"] }, "Prefix": "www" },
                { "BranchName": { "Fn::GetAtt": [dev, "BranchName"] }, "Prefix": "develop" },
            ])
        );
        assert_eq!(outputs.subdomains.len(), 3);
    }

    #[test]
    fn test_site_url_output() {
        let (scope, outputs) = build(&auth()).unwrap();
        let (app_id, _) = scope
            .template()
            .single_resource_of_type("AWS::Amplify::App")
            .unwrap();
        let output = scope.template().output(SITE_URL_OUTPUT).unwrap();
        assert_eq!(
            output.value,
            json!({ "Fn::GetAtt": [app_id.as_str(), "DefaultDomain"] })
        );
        assert_eq!(outputs.default_domain, scope.attribute(app_id, "DefaultDomain"));
    }

    #[test]
    fn test_rebuild_is_identical() {
        let auth = auth();
        let (first, _) = build(&auth).unwrap();
        let (second, _) = build(&auth).unwrap();
        assert_eq!(first.template(), second.template());
    }

    #[test]
    fn test_no_auto_branch_config_without_patterns() {
        let creds = credentials();
        let auth = auth();
        let settings = SiteConfig {
            auto_branch_patterns: Vec::new(),
            auto_subdomain_patterns: Vec::new(),
            ..SiteConfig::default()
        };
        let mut scope = scope();
        SiteStack::new("simple-static-website", &creds, &auth, &settings)
            .build(&mut scope)
            .unwrap();
        let template = scope.template();
        assert!(!app_resource(template).properties.contains_key("AutoBranchCreationConfig"));
        let (_, domain) = template.single_resource_of_type("AWS::Amplify::Domain").unwrap();
        assert_eq!(domain.properties["EnableAutoSubDomain"], false);
        assert!(!domain.properties.contains_key("AutoSubDomainIAMRole"));
    }
}
