//! CLI command implementations.

pub mod synth;

use anyhow::{Context, Result};
use staticweb_config::{AppConfig, DEFAULT_CONFIG_FILE, load_app_config};
use staticweb_core::StackEnv;
use staticweb_stacks::buildspec::BuildSpec;
use staticweb_stacks::site::ENVIRONMENT_KEYS;
use std::path::Path;
use tracing::info;

/// Region of the deployment environment: the flag (or `CDK_DEFAULT_REGION`)
/// first, then `AWS_REGION`.
pub fn environment_region(flag: Option<String>, aws_region: Option<String>) -> Option<String> {
    flag.filter(|r| !r.trim().is_empty())
        .or(aws_region.filter(|r| !r.trim().is_empty()))
}

/// Load the configuration at `path`, or `staticweb.kdl` when it exists, or
/// fall back to the reference deployment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return load_app_config(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        return load_app_config(default_path)
            .with_context(|| format!("failed to load configuration from {}", DEFAULT_CONFIG_FILE));
    }

    info!(
        file = DEFAULT_CONFIG_FILE,
        "no configuration file found, using the built-in reference deployment"
    );
    Ok(AppConfig::default())
}

pub fn stack_env(config: &AppConfig, region: Option<&str>, account: Option<String>) -> StackEnv {
    StackEnv::resolve(config.region.as_deref(), region).with_account(account)
}

pub fn validate(path: &Path) -> Result<()> {
    let config = load_app_config(path)
        .with_context(|| format!("configuration {} is invalid", path.display()))?;
    println!(
        "Configuration is valid: app '{}' from {}/{}",
        config.app_name, config.repository.owner, config.repository.name
    );
    Ok(())
}

pub fn buildspec(config: &AppConfig) -> Result<()> {
    let keys: Vec<String> = ENVIRONMENT_KEYS
        .iter()
        .map(|key| format!("{}{}", config.site.env_prefix, key))
        .collect();
    let yaml = BuildSpec::for_site(&config.site, &keys)
        .to_yaml()
        .context("failed to render build specification")?;
    print!("{}", yaml);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_region_precedence() {
        assert_eq!(
            environment_region(Some("eu-west-1".into()), Some("us-west-2".into())),
            Some("eu-west-1".to_string())
        );
        assert_eq!(
            environment_region(None, Some("us-west-2".into())),
            Some("us-west-2".to_string())
        );
        assert_eq!(
            environment_region(Some(" ".into()), Some("us-west-2".into())),
            Some("us-west-2".to_string())
        );
        assert_eq!(environment_region(None, None), None);
    }

    #[test]
    fn test_configured_region_wins() {
        let mut config = AppConfig::default();
        config.region = Some("ap-southeast-2".to_string());
        let env = stack_env(&config, Some("eu-west-1"), Some("123456789012".to_string()));
        assert_eq!(env.region, "ap-southeast-2");
        assert_eq!(env.manifest_environment(), "aws://123456789012/ap-southeast-2");
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/staticweb.kdl"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/staticweb.kdl"));
    }
}
