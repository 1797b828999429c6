//! Deployment environment (account and region) for the stacks of an app.

use serde::Serialize;
use tracing::warn;

/// Region used when neither the configuration nor the deployment
/// environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Where the resolved region came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionSource {
    Config,
    Environment,
    Default,
}

impl std::fmt::Display for RegionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionSource::Config => write!(f, "config"),
            RegionSource::Environment => write!(f, "environment"),
            RegionSource::Default => write!(f, "default"),
        }
    }
}

/// Target account and region shared by every stack of an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEnv {
    pub account: Option<String>,
    pub region: String,
    pub region_source: RegionSource,
}

impl StackEnv {
    /// Resolve the region: configured value, then deployment environment,
    /// then [`DEFAULT_REGION`]. Blank values count as unset.
    pub fn resolve(configured: Option<&str>, environment: Option<&str>) -> Self {
        let pick = |v: Option<&str>| v.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);

        let (region, region_source) = if let Some(region) = pick(configured) {
            (region, RegionSource::Config)
        } else if let Some(region) = pick(environment) {
            (region, RegionSource::Environment)
        } else {
            warn!(
                region = DEFAULT_REGION,
                "no region configured or set in the deployment environment, using default"
            );
            (DEFAULT_REGION.to_string(), RegionSource::Default)
        };

        Self {
            account: None,
            region,
            region_source,
        }
    }

    pub fn with_account(mut self, account: Option<String>) -> Self {
        self.account = account.filter(|a| !a.trim().is_empty());
        self
    }

    /// Environment string used in the assembly manifest.
    pub fn manifest_environment(&self) -> String {
        format!(
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region
        )
    }
}

impl Default for StackEnv {
    fn default() -> Self {
        Self::resolve(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_region_when_unset() {
        let env = StackEnv::resolve(None, None);
        assert_eq!(env.region, "us-east-1");
        assert_eq!(env.region_source, RegionSource::Default);
    }

    #[test]
    fn test_configured_region_wins() {
        let env = StackEnv::resolve(Some("eu-west-1"), Some("ap-south-1"));
        assert_eq!(env.region, "eu-west-1");
        assert_eq!(env.region_source, RegionSource::Config);
    }

    #[test]
    fn test_environment_region_used_when_not_configured() {
        let env = StackEnv::resolve(None, Some("ap-south-1"));
        assert_eq!(env.region, "ap-south-1");
        assert_eq!(env.region_source, RegionSource::Environment);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let env = StackEnv::resolve(Some("  "), Some(""));
        assert_eq!(env.region, DEFAULT_REGION);
        assert_eq!(env.region_source, RegionSource::Default);
    }

    #[test]
    fn test_manifest_environment() {
        let env = StackEnv::resolve(Some("eu-west-1"), None);
        assert_eq!(env.manifest_environment(), "aws://unknown-account/eu-west-1");
        let env = env.with_account(Some("123456789012".to_string()));
        assert_eq!(env.manifest_environment(), "aws://123456789012/eu-west-1");
    }
}
