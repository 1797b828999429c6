//! Stack names and logical resource identifiers.

use derive_more::Display;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::{Error, Result};

static STACK_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$").unwrap());

const MAX_LOGICAL_ID_LEN: usize = 255;
const HASH_LEN: usize = 8;

/// Name of a deployable stack. Also the prefix of every export it publishes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display)]
#[serde(transparent)]
#[display("{_0}")]
pub struct StackName(String);

impl StackName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !STACK_NAME_REGEX.is_match(&name) {
            return Err(Error::InvalidName {
                name,
                message: "must be a letter followed by up to 127 letters, digits or hyphens"
                    .to_string(),
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for StackName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Identifier of a resource or output inside one template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display)]
#[serde(transparent)]
#[display("{_0}")]
pub struct LogicalId(String);

impl LogicalId {
    /// Use `id` verbatim. It must be alphanumeric.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_LOGICAL_ID_LEN {
            return Err(Error::InvalidName {
                name: id,
                message: format!("logical ids must be 1-{MAX_LOGICAL_ID_LEN} characters"),
            });
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidName {
                name: id,
                message: "logical ids must be alphanumeric".to_string(),
            });
        }
        Ok(Self(id))
    }

    /// Derive an id from a construct path: the alphanumeric part of every
    /// component followed by the first eight hex digits of the path's MD5.
    ///
    /// The suffix keeps ids stable across runs while keeping two paths that
    /// sanitize to the same text apart (`a-b/c` vs `ab/c`).
    pub fn from_path(path: &[&str]) -> Result<Self> {
        if path.is_empty() || path.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidName {
                name: path.join("/"),
                message: "construct path components must be non-empty".to_string(),
            });
        }

        let mut human: String = path
            .iter()
            .flat_map(|p| p.chars())
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        human.truncate(MAX_LOGICAL_ID_LEN - HASH_LEN);

        let digest = format!("{:X}", md5::compute(path.join("/")));
        Self::new(format!("{human}{}", &digest[..HASH_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
