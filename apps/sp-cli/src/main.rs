//! # sp-cli
//!
//! Command-line interface for stack policies.
//!
//! - `stackpolicy plan`: apply a policy bundle against a recording
//!   provisioner and print what would be declared
//! - `stackpolicy settings get/post`: read or write a stack's deployment
//!   settings directly

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sp_policy::ApplicatorConfig;
use tracing_subscriber::EnvFilter;

/// Relative location of the applicator config under the project root.
const CONFIG_FILE: &str = ".stackpolicy/config.toml";

/// Plan stack policies and inspect deployment settings.
#[derive(Parser)]
#[command(name = "stackpolicy", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Config file (defaults to .stackpolicy/config.toml under the project root).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a policy bundle for one stack.
    Plan(commands::plan::PlanArgs),
    /// Read or write deployment settings.
    Settings {
        #[command(subcommand)]
        command: commands::settings::SettingsCommands,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("sp_policy=info".parse()?)
                .add_directive("sp_service=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let config_path = cli
        .config
        .unwrap_or_else(|| project_root.join(CONFIG_FILE));
    let config = ApplicatorConfig::load_or_default(&config_path);

    let runtime = tokio::runtime::Runtime::new()?;
    match &cli.command {
        Commands::Plan(args) => runtime.block_on(commands::plan::execute(args, config)),
        Commands::Settings { command } => {
            runtime.block_on(commands::settings::execute(command, &config))
        }
    }
}
