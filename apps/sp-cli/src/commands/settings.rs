// settings.rs — Settings subcommands: get, post.

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use sp_policy::{AccessToken, ApplicatorConfig, DeploymentSettingsDocument, StackIdentity};
use sp_service::{ServiceConfig, StackServiceClient};

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print a stack's deployment settings as JSON.
    Get {
        /// Project name (defaults to $PULUMI_PROJECT).
        #[arg(long)]
        project: Option<String>,
        /// Stack name (defaults to the configured template stack).
        #[arg(long)]
        stack: Option<String>,
    },
    /// Overwrite a stack's deployment settings from a JSON file.
    Post {
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        stack: String,
        /// Settings document (JSON object).
        #[arg(long)]
        file: PathBuf,
    },
}

fn client(config: &ApplicatorConfig, token: AccessToken) -> anyhow::Result<StackServiceClient> {
    Ok(StackServiceClient::new(ServiceConfig::from_applicator(
        config,
        token,
    ))?)
}

pub async fn execute(cmd: &SettingsCommands, config: &ApplicatorConfig) -> anyhow::Result<()> {
    match cmd {
        SettingsCommands::Get { project, stack } => {
            let stack = stack.as_deref().unwrap_or(&config.template_stack);
            let context = super::context(config, project.as_deref(), Some(stack));
            let identity = StackIdentity::resolve(&config.organization, &context);
            let document = client(config, context.resolve_access_token())?
                .get_deployment_settings(&identity)
                .await?;
            println!("{}", serde_json::to_string_pretty(document.as_value())?);
        }

        SettingsCommands::Post {
            project,
            stack,
            file,
        } => {
            let raw = std::fs::read_to_string(file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let value: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("invalid JSON in {}", file.display()))?;
            let document = DeploymentSettingsDocument::try_from(value)
                .map_err(|reason| anyhow::anyhow!("{}: {}", file.display(), reason))?;

            let context = super::context(config, project.as_deref(), Some(stack.as_str()));
            let identity = StackIdentity::resolve(&config.organization, &context);
            client(config, context.resolve_access_token())?
                .post_deployment_settings(&identity, &document)
                .await?;
            println!("Deployment settings written for {}", identity);
        }
    }
    Ok(())
}
