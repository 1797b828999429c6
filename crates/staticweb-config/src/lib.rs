//! KDL configuration parsing for staticweb.
//!
//! This crate handles parsing of:
//! - The application definition (staticweb.kdl)
//! - Repository, identity and site settings with their reference defaults

pub mod app;
pub mod error;
mod kdl_ext;

pub use app::{
    AppConfig, DEFAULT_CONFIG_FILE, IdentityConfig, RepositoryConfig, SiteConfig, load_app_config,
    parse_app_config,
};
pub use error::{ConfigError, ConfigResult};
