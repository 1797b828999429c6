//! Core composition types for staticweb.
//!
//! This crate contains:
//! - Stack and logical identifiers
//! - Tokens (literals, references, deferred secret values)
//! - Deployment templates and outputs
//! - Per-stack declaration scopes and cross-stack references
//! - The application assembly that orders and wires stacks
//! - The value bundles handed from producer stacks to consumers

pub mod app;
pub mod bundle;
pub mod env;
pub mod error;
pub mod id;
pub mod scope;
pub mod template;
pub mod token;

pub use app::{App, CloudAssembly, Stack, StackArtifact};
pub use bundle::{CognitoAuthConfig, GithubCredentials, PartialCognitoAuthConfig};
pub use env::{DEFAULT_REGION, RegionSource, StackEnv};
pub use error::{Error, Result};
pub use id::{LogicalId, StackName};
pub use scope::StackScope;
pub use token::{PseudoParameter, Reference, SecretReference, Token};
