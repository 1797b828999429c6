//! Stacks of the static website deployment.
//!
//! Provides:
//! - `SecretStack`: placeholder secret for the repository access token
//! - `IdentityStack`: user pool, client, identity pool and trust roles
//! - `SiteStack`: hosted build pipeline, branches and custom domain
//! - `compose`: builds all three in dependency order

pub mod buildspec;
pub mod compose;
pub mod domain;
pub mod identity;
pub mod policy;
pub mod secret;
pub mod site;

pub use compose::{COGNITO_STACK, SECRET_STACK, SITE_STACK, compose};
pub use identity::IdentityStack;
pub use secret::SecretStack;
pub use site::{SiteOutputs, SiteStack, build_environment};
