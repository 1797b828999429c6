//! Build specification executed by the hosting service for every deployment.

use serde::Serialize;
use staticweb_config::SiteConfig;
use staticweb_core::{Error, Result};

pub const BUILD_SPEC_VERSION: &str = "1.0";
pub const ENV_FILE: &str = ".env";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSpec {
    pub version: String,
    pub frontend: Frontend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frontend {
    pub phases: Phases,
    pub artifacts: Artifacts,
    pub cache: Cache,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Phases {
    pub pre_build: Phase,
    pub build: Phase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifacts {
    pub base_directory: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cache {
    pub paths: Vec<String>,
}

impl BuildSpec {
    /// Install dependencies, copy each of `env_keys` from the build
    /// environment into the env file, then build.
    pub fn for_site<S: AsRef<str>>(site: &SiteConfig, env_keys: &[S]) -> Self {
        let mut build_commands: Vec<String> = env_keys
            .iter()
            .map(|key| {
                let key = key.as_ref();
                format!("echo {key}=${key} >> {ENV_FILE}")
            })
            .collect();
        build_commands.push(site.build_command.clone());

        Self {
            version: BUILD_SPEC_VERSION.to_string(),
            frontend: Frontend {
                phases: Phases {
                    pre_build: Phase {
                        commands: vec![site.install_command.clone()],
                    },
                    build: Phase {
                        commands: build_commands,
                    },
                },
                artifacts: Artifacts {
                    base_directory: site.artifact_dir.clone(),
                    files: vec!["**/*".to_string()],
                },
                cache: Cache {
                    paths: site.cache_paths.clone(),
                },
            },
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Render(format!("build spec: {e}")))
    }
}
