// legacy.rs — TEMPORARY cache-options patch.
//
// Deployment cache options are not part of the declarative settings API yet,
// so the replicated document is additionally posted straight to the
// settings endpoint. Delete this module (and the `legacy_cache_patch`
// config switch) once `DeploymentSettingsArgs` can carry cache options.

use std::sync::Arc;

use crate::error::Result;
use crate::identity::StackIdentity;
use crate::provision::Provisioner;
use crate::resource::{CommandArgs, Declaration, ResourceHandle, ResourceKind, ResourceOptions};
use crate::settings::DeploymentSettingsDocument;

/// Suffix of the legacy command declaration.
pub const CACHE_PATCH_SUFFIX: &str = "set-caching-option";

/// Writes settings the declarative API cannot express yet.
///
/// Deprecated: exists only until the declarative API covers cache options.
/// Failures are logged by the caller and never fail an application.
pub trait LegacyCachePatch: Send + Sync {
    fn patch(
        &self,
        instance: &str,
        target: &StackIdentity,
        document: &DeploymentSettingsDocument,
        settings: &ResourceHandle,
        options: ResourceOptions,
    ) -> Result<()>;
}

/// Declares a local command that posts the document with `curl`.
///
/// The command reads the token from the environment at execution time so
/// the secret never lands in the command text. Changes to the text are
/// ignored by the runtime.
pub struct CommandCachePatch {
    provisioner: Arc<dyn Provisioner>,
    api_url: String,
    token_env: String,
}

impl CommandCachePatch {
    pub fn new(
        provisioner: Arc<dyn Provisioner>,
        api_url: impl Into<String>,
        token_env: impl Into<String>,
    ) -> Self {
        Self {
            provisioner,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token_env: token_env.into(),
        }
    }

    fn command_text(&self, target: &StackIdentity, document: &DeploymentSettingsDocument) -> String {
        let body = document.as_value().to_string().replace('\'', r"'\''");
        format!(
            "curl -s -H \"Content-Type: application/json\" -H \"Authorization: token ${}\" \
             --request POST --data '{}' {}/api/stacks/{}/deployments/settings &> /dev/null",
            self.token_env,
            body,
            self.api_url,
            target.path()
        )
    }
}

impl LegacyCachePatch for CommandCachePatch {
    fn patch(
        &self,
        instance: &str,
        target: &StackIdentity,
        document: &DeploymentSettingsDocument,
        settings: &ResourceHandle,
        options: ResourceOptions,
    ) -> Result<()> {
        let declaration = Declaration::new(
            ResourceKind::Command,
            format!("{}-{}", instance, CACHE_PATCH_SUFFIX),
            &CommandArgs {
                create: self.command_text(target, document),
            },
            options
                .depends_on(settings.urn.clone())
                .ignore_changes("create"),
        );
        self.provisioner.declare(declaration)?;
        Ok(())
    }
}
