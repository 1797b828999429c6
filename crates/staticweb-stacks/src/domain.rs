//! Branch-to-subdomain mapping for the custom domain.

use regex::Regex;
use staticweb_core::{Error, Result};
use std::sync::LazyLock;

static DNS_LABEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").unwrap());

pub const WWW_PREFIX: &str = "www";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchRole {
    Production,
    Development,
}

/// One `prefix.domain` → branch mapping. An empty prefix is the domain root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdomainMapping {
    pub role: BranchRole,
    pub branch: String,
    pub prefix: String,
}

impl SubdomainMapping {
    pub fn is_root(&self) -> bool {
        self.prefix.is_empty()
    }
}

/// Production serves the root and `www`; development gets a subdomain named
/// after its branch and never the root.
pub fn plan_subdomains(prod_branch: &str, dev_branch: &str) -> Result<Vec<SubdomainMapping>> {
    if prod_branch == dev_branch {
        return Err(Error::invalid_value(
            "dev_branch",
            "production and development branches must differ",
        ));
    }

    let dev_prefix = dev_branch.to_string();
    if !DNS_LABEL_REGEX.is_match(&dev_prefix) || dev_prefix == WWW_PREFIX {
        return Err(Error::invalid_value(
            "dev_branch",
            format!("'{}' cannot be used as a subdomain prefix", dev_branch),
        ));
    }

    Ok(vec![
        SubdomainMapping {
            role: BranchRole::Production,
            branch: prod_branch.to_string(),
            prefix: String::new(),
        },
        SubdomainMapping {
            role: BranchRole::Production,
            branch: prod_branch.to_string(),
            prefix: WWW_PREFIX.to_string(),
        },
        SubdomainMapping {
            role: BranchRole::Development,
            branch: dev_branch.to_string(),
            prefix: dev_prefix,
        },
    ])
}
