//! Builds the three stacks in dependency order and wires them together.

use staticweb_config::{AppConfig, ConfigError};
use staticweb_core::{App, CloudAssembly, Error, Result, StackEnv};
use tracing::info;

use crate::{IdentityStack, SecretStack, SiteStack};

pub const SECRET_STACK: &str = "SecretStack";
pub const COGNITO_STACK: &str = "CognitoStack";
pub const SITE_STACK: &str = "StaticWebStack";

/// Build every stack of the application and synthesize the assembly.
pub fn compose(config: &AppConfig, env: StackEnv) -> Result<CloudAssembly> {
    config.validate().map_err(config_error)?;

    info!(
        app = %config.app_name,
        region = %env.region,
        region_source = %env.region_source,
        "composing stacks"
    );

    let mut app = App::new(env);

    let credentials = app.add_stack(SECRET_STACK, &SecretStack::new(&config.repository))?;
    let auth = app.add_stack(COGNITO_STACK, &IdentityStack::new(&config.identity))?;
    app.add_stack(
        SITE_STACK,
        &SiteStack::new(&config.app_name, &credentials, &auth, &config.site),
    )?;
    // The token is read when the hosted app is created, whether or not the
    // credentials name the secret through a cross-stack reference.
    app.add_dependency(SITE_STACK, SECRET_STACK)?;

    app.synth()
}

fn config_error(err: ConfigError) -> Error {
    match err {
        ConfigError::MissingField(field) => Error::MissingField(field),
        ConfigError::InvalidValue { field, message } => Error::InvalidValue { field, message },
        other => Error::invalid_value("configuration", other.to_string()),
    }
}
