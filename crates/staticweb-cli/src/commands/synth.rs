//! Synthesis commands.

use anyhow::{Context, Result};
use staticweb_config::AppConfig;
use staticweb_core::StackEnv;
use staticweb_stacks::compose;
use staticweb_stacks::secret::TOKEN_ARN_OUTPUT;
use std::path::Path;
use tracing::info;

pub fn synth(config: &AppConfig, env: StackEnv, out: &Path) -> Result<()> {
    let assembly = compose(config, env).context("failed to compose stacks")?;
    let written = assembly
        .write_to(out)
        .with_context(|| format!("failed to write assembly to {}", out.display()))?;

    for path in &written {
        println!("{}", path.display());
    }
    for (stack, outputs) in assembly.outputs() {
        println!("{}: {}", stack, outputs.join(", "));
    }

    info!(
        output = TOKEN_ARN_OUTPUT,
        "after deploying, set the repository token with: aws secretsmanager \
         put-secret-value --secret-id <{TOKEN_ARN_OUTPUT}> --secret-string <token>"
    );
    Ok(())
}

pub fn list(config: &AppConfig, env: StackEnv) -> Result<()> {
    let assembly = compose(config, env).context("failed to compose stacks")?;

    println!("{:<20} {:<30} DEPENDS ON", "STACK", "ENVIRONMENT");
    println!("{}", "-".repeat(72));
    for artifact in assembly.artifacts() {
        let deps: Vec<&str> = artifact.dependencies.iter().map(|d| d.as_str()).collect();
        println!(
            "{:<20} {:<30} {}",
            artifact.name.as_str(),
            artifact.environment,
            if deps.is_empty() {
                "-".to_string()
            } else {
                deps.join(", ")
            }
        );
    }
    Ok(())
}
