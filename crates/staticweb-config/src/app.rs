//! Application configuration parsing.
//!
//! ```kdl
//! app "simple-static-website"
//! region "us-east-1"
//! repository owner="egochao" name="simple_gatsby_blog" {
//!     prod-branch "master"
//!     dev-branch "develop"
//! }
//! identity {
//!     user-pool-name "static-web-app-user-pool"
//! }
//! site {
//!     domain "ctablog.net"
//!     env-prefix "GATSBY_"
//! }
//! ```
//!
//! `app` and `repository` are required. Everything under `identity` and
//! `site` falls back to the values of the reference deployment.

use kdl::{KdlDocument, KdlNode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::kdl_ext::{all_string_args, first_bool_arg, first_string_arg, string_prop_or_child};
use crate::{ConfigError, ConfigResult};

pub const DEFAULT_CONFIG_FILE: &str = "staticweb.kdl";

static REPO_PART_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap());
static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$").unwrap()
});
static ENV_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][A-Z0-9_]*)?$").unwrap());
static REGION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$").unwrap());

/// Complete application definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    /// Overrides the deployment environment's region when set.
    pub region: Option<String>,
    pub repository: RepositoryConfig,
    pub identity: IdentityConfig,
    pub site: SiteConfig,
}

/// Source repository of the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
    pub prod_branch: String,
    pub dev_branch: String,
}

/// User directory and client registration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub user_pool_name: String,
    pub client_name: String,
    pub generate_secret: bool,
}

/// Hosting, domain and build settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub domain: String,
    /// Prefix of the build-time environment variables, e.g. `GATSBY_`.
    pub env_prefix: String,
    pub auto_branch_patterns: Vec<String>,
    pub auto_subdomain_patterns: Vec<String>,
    pub install_command: String,
    pub build_command: String,
    pub artifact_dir: String,
    pub cache_paths: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "simple-static-website".to_string(),
            region: None,
            repository: RepositoryConfig::default(),
            identity: IdentityConfig::default(),
            site: SiteConfig::default(),
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            owner: "egochao".to_string(),
            name: "simple_gatsby_blog".to_string(),
            prod_branch: "master".to_string(),
            dev_branch: "develop".to_string(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_pool_name: "static-web-app-user-pool".to_string(),
            client_name: "static-web-app-user-pool-client".to_string(),
            generate_secret: true,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            domain: "ctablog.net".to_string(),
            env_prefix: "GATSBY_".to_string(),
            auto_branch_patterns: vec!["feature/*".to_string(), "test/*".to_string()],
            auto_subdomain_patterns: vec!["*".to_string(), "pr*".to_string()],
            install_command: "npm install".to_string(),
            build_command: "npm run build".to_string(),
            artifact_dir: "public".to_string(),
            cache_paths: vec!["node_modules/**/*".to_string()],
        }
    }
}

impl AppConfig {
    /// Check every field that the stacks rely on.
    pub fn validate(&self) -> ConfigResult<()> {
        require("app name", &self.app_name)?;

        if let Some(region) = &self.region {
            if !REGION_REGEX.is_match(region) {
                return Err(ConfigError::invalid(
                    "region",
                    format!("'{}' is not a region name", region),
                ));
            }
        }

        let repo = &self.repository;
        for (field, value) in [("repository owner", &repo.owner), ("repository name", &repo.name)] {
            require(field, value)?;
            if !REPO_PART_REGEX.is_match(value) {
                return Err(ConfigError::invalid(
                    field,
                    format!("'{}' contains characters not allowed in repository paths", value),
                ));
            }
        }
        require("repository prod-branch", &repo.prod_branch)?;
        require("repository dev-branch", &repo.dev_branch)?;
        if repo.prod_branch == repo.dev_branch {
            return Err(ConfigError::invalid(
                "repository dev-branch",
                "must differ from prod-branch",
            ));
        }

        require("identity user-pool-name", &self.identity.user_pool_name)?;
        require("identity client-name", &self.identity.client_name)?;

        let site = &self.site;
        require("site domain", &site.domain)?;
        if !DOMAIN_REGEX.is_match(&site.domain) {
            return Err(ConfigError::invalid(
                "site domain",
                format!("'{}' is not a lowercase domain name", site.domain),
            ));
        }
        if !ENV_PREFIX_REGEX.is_match(&site.env_prefix) {
            return Err(ConfigError::invalid(
                "site env-prefix",
                "must be uppercase letters, digits and underscores, starting with a letter",
            ));
        }
        require("site install-command", &site.install_command)?;
        require("site build-command", &site.build_command)?;
        require("site artifact-dir", &site.artifact_dir)?;
        if site.auto_subdomain_patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "site auto-subdomain-patterns",
                "patterns must be non-empty",
            ));
        }
        if site.auto_branch_patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "site auto-branch-patterns",
                "patterns must be non-empty",
            ));
        }

        Ok(())
    }
}

fn require(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField(field.to_string()));
    }
    Ok(())
}

/// Read and parse an application configuration file.
pub fn load_app_config(path: &Path) -> ConfigResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), "loaded configuration file");
    parse_app_config(&content)
}

/// Parse an application configuration from KDL text and validate it.
pub fn parse_app_config(kdl: &str) -> ConfigResult<AppConfig> {
    let doc: KdlDocument = kdl.parse()?;

    let mut app_name: Option<String> = None;
    let mut region: Option<String> = None;
    let mut repository: Option<RepositoryConfig> = None;
    let mut identity: Option<IdentityConfig> = None;
    let mut site: Option<SiteConfig> = None;

    for node in doc.nodes() {
        match node.name().value() {
            "app" => {
                let name = first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("app name".to_string()))?;
                set_once(&mut app_name, name, "app")?;
            }
            "region" => {
                let value = first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("region value".to_string()))?;
                set_once(&mut region, value, "region")?;
            }
            "repository" => set_once(&mut repository, parse_repository(node)?, "repository")?,
            "identity" => set_once(&mut identity, parse_identity(node)?, "identity")?,
            "site" => set_once(&mut site, parse_site(node)?, "site")?,
            other => warn!(node = other, "ignoring unknown configuration node"),
        }
    }

    let config = AppConfig {
        app_name: app_name.ok_or_else(|| ConfigError::MissingField("app name".to_string()))?,
        region,
        repository: repository
            .ok_or_else(|| ConfigError::MissingField("repository".to_string()))?,
        identity: identity.unwrap_or_default(),
        site: site.unwrap_or_default(),
    };
    config.validate()?;
    Ok(config)
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: &str) -> ConfigResult<()> {
    if slot.is_some() {
        return Err(ConfigError::Duplicate(format!("'{}' node", name)));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_repository(node: &KdlNode) -> ConfigResult<RepositoryConfig> {
    let field = |name: &str| {
        string_prop_or_child(node, name)
            .ok_or_else(|| ConfigError::MissingField(format!("repository {}", name)))
    };

    Ok(RepositoryConfig {
        owner: field("owner")?,
        name: field("name")?,
        prod_branch: field("prod-branch")?,
        dev_branch: field("dev-branch")?,
    })
}

fn parse_identity(node: &KdlNode) -> ConfigResult<IdentityConfig> {
    let mut identity = IdentityConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "user-pool-name" => {
                    identity.user_pool_name = string_arg(child, "identity user-pool-name")?;
                }
                "client-name" => {
                    identity.client_name = string_arg(child, "identity client-name")?;
                }
                "generate-secret" => {
                    identity.generate_secret = first_bool_arg(child).ok_or_else(|| {
                        ConfigError::invalid("identity generate-secret", "expected #true or #false")
                    })?;
                }
                other => warn!(node = other, "ignoring unknown identity setting"),
            }
        }
    }

    Ok(identity)
}

fn parse_site(node: &KdlNode) -> ConfigResult<SiteConfig> {
    let mut site = SiteConfig::default();
    let mut cache_paths = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "domain" => site.domain = string_arg(child, "site domain")?,
                "env-prefix" => site.env_prefix = string_arg(child, "site env-prefix")?,
                "auto-branch-patterns" => site.auto_branch_patterns = all_string_args(child),
                "auto-subdomain-patterns" => site.auto_subdomain_patterns = all_string_args(child),
                "install-command" => {
                    site.install_command = string_arg(child, "site install-command")?;
                }
                "build-command" => site.build_command = string_arg(child, "site build-command")?,
                "artifact-dir" => site.artifact_dir = string_arg(child, "site artifact-dir")?,
                "cache-path" => cache_paths.extend(all_string_args(child)),
                other => warn!(node = other, "ignoring unknown site setting"),
            }
        }
    }

    if !cache_paths.is_empty() {
        site.cache_paths = cache_paths;
    }
    Ok(site)
}

fn string_arg(node: &KdlNode, field: &str) -> ConfigResult<String> {
    first_string_arg(node).ok_or_else(|| ConfigError::MissingField(field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        app "blog"
        region "eu-west-1"
        repository owner="someone" name="my-site" {
            prod-branch "main"
            dev-branch "staging"
        }
        identity {
            user-pool-name "blog-users"
            client-name "blog-client"
            generate-secret #false
        }
        site {
            domain "example.org"
            env-prefix "VITE_"
            auto-branch-patterns "feat/*"
            auto-subdomain-patterns "*"
            install-command "pnpm install"
            build-command "pnpm build"
            artifact-dir "dist"
            cache-path "node_modules/**/*"
            cache-path ".pnpm-store/**/*"
        }
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_app_config(FULL).unwrap();
        assert_eq!(config.app_name, "blog");
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.repository.owner, "someone");
        assert_eq!(config.repository.name, "my-site");
        assert_eq!(config.repository.prod_branch, "main");
        assert_eq!(config.repository.dev_branch, "staging");
        assert_eq!(config.identity.user_pool_name, "blog-users");
        assert!(!config.identity.generate_secret);
        assert_eq!(config.site.domain, "example.org");
        assert_eq!(config.site.env_prefix, "VITE_");
        assert_eq!(config.site.auto_branch_patterns, vec!["feat/*"]);
        assert_eq!(config.site.auto_subdomain_patterns, vec!["*"]);
        assert_eq!(config.site.build_command, "pnpm build");
        assert_eq!(config.site.artifact_dir, "dist");
        assert_eq!(
            config.site.cache_paths,
            vec!["node_modules/**/*", ".pnpm-store/**/*"]
        );
    }

    #[test]
    fn test_minimal_config_uses_reference_defaults() {
        let kdl = r#"
            app "simple-static-website"
            repository {
                owner "egochao"
                name "simple_gatsby_blog"
                prod-branch "master"
                dev-branch "develop"
            }
        "#;
        let config = parse_app_config(kdl).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_missing_repository() {
        let result = parse_app_config(r#"app "blog""#);
        assert!(matches!(result, Err(ConfigError::MissingField(f)) if f == "repository"));
    }

    #[test]
    fn test_missing_branch_is_named() {
        let kdl = r#"
            app "blog"
            repository owner="someone" name="my-site" {
                prod-branch "main"
            }
        "#;
        let result = parse_app_config(kdl);
        assert!(matches!(
            result,
            Err(ConfigError::MissingField(f)) if f == "repository dev-branch"
        ));
    }

    #[test]
    fn test_same_branches_rejected() {
        let kdl = r#"
            app "blog"
            repository owner="someone" name="my-site" prod-branch="main" dev-branch="main"
        "#;
        assert!(matches!(
            parse_app_config(kdl),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_duplicate_node() {
        let kdl = r#"
            app "blog"
            app "other"
            repository owner="someone" name="my-site" prod-branch="main" dev-branch="dev"
        "#;
        assert!(matches!(parse_app_config(kdl), Err(ConfigError::Duplicate(_))));
    }

    #[test]
    fn test_invalid_domain() {
        let mut config = AppConfig::default();
        config.site.domain = "Not A Domain".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "site domain"
        ));
    }

    #[test]
    fn test_invalid_env_prefix() {
        let mut config = AppConfig::default();
        config.site.env_prefix = "gatsby-".to_string();
        assert!(config.validate().is_err());
        config.site.env_prefix = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_region() {
        let mut config = AppConfig::default();
        config.region = Some("moon".to_string());
        assert!(config.validate().is_err());
        config.region = Some("ap-southeast-2".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            parse_app_config("app \"unterminated"),
            Err(ConfigError::Parse(_))
        ));
    }
}
