//! staticweb CLI tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "staticweb")]
#[command(about = "Synthesize the static website deployment stacks", long_about = None)]
struct Cli {
    /// Deployment region, used when the configuration does not name one
    #[arg(long, global = true, env = "CDK_DEFAULT_REGION")]
    region: Option<String>,

    /// Deployment account
    #[arg(long, global = true, env = "CDK_DEFAULT_ACCOUNT")]
    account: Option<String>,

    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose all stacks and write templates plus manifest
    Synth {
        /// Output directory
        #[arg(long, default_value = "cdk.out")]
        out: PathBuf,
    },
    /// List stacks in deployment order
    List,
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(default_value = staticweb_config::DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },
    /// Print the rendered build specification
    Buildspec,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let region = commands::environment_region(cli.region, std::env::var("AWS_REGION").ok());

    match cli.command {
        Commands::Synth { out } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let env = commands::stack_env(&config, region.as_deref(), cli.account);
            commands::synth::synth(&config, env, &out)?;
        }
        Commands::List => {
            let config = commands::load_config(cli.config.as_deref())?;
            let env = commands::stack_env(&config, region.as_deref(), cli.account);
            commands::synth::list(&config, env)?;
        }
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
        Commands::Buildspec => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::buildspec(&config)?;
        }
    }

    Ok(())
}
