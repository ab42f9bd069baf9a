// replication.rs — Deployment-settings replication.
//
// New persistent stacks inherit the deployment settings of the template
// stack:
//
// 1. Read the template stack's settings from the service.
// 2. Point the git source at `refs/heads/<stack>` (unless disabled, or the
//    target is the template itself).
// 3. Merge the bundle's raw override, if any.
// 4. Declare the settings for the target stack, retained on delete, with
//    the access token injected as a secret environment variable.
// 5. Optionally run the legacy cache-options patch (failures only logged).
//
// This runs on a detached task so the other concerns never wait on the
// network. The task logs its own outcome before handing it back.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::ReplicationFailure;
use crate::error::{PolicyError, Result};
use crate::identity::{AccessToken, StackIdentity};
use crate::legacy::LegacyCachePatch;
use crate::provision::Provisioner;
use crate::resource::{
    DeploymentSettingsArgs, Declaration, OperationContextArgs, ResourceHandle, ResourceKind,
    ResourceOptions,
};
use crate::settings::{DeploymentSettingsDocument, SettingsSource};

pub const SUFFIX: &str = "deployment-settings";

/// How a replication run ended when it did not abort.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplicationOutcome {
    /// Settings were declared for the target stack.
    Replicated {
        settings: ResourceHandle,
        /// Branch the replicated settings deploy from.
        branch: Option<String>,
    },
    /// The template settings could not be fetched and the failure policy
    /// said to carry on.
    Skipped { reason: String },
}

/// Everything one replication run needs, owned so it can move to a task.
pub struct Replicator {
    pub instance: String,
    pub target: StackIdentity,
    pub template: StackIdentity,
    pub token: AccessToken,
    pub token_env: String,
    pub rewrite_branch: bool,
    pub failure: ReplicationFailure,
    pub override_patch: Option<serde_json::Value>,
    pub options: ResourceOptions,
    pub source: Arc<dyn SettingsSource>,
    pub provisioner: Arc<dyn Provisioner>,
    pub cache_patch: Option<Arc<dyn LegacyCachePatch>>,
}

impl Replicator {
    pub async fn run(self) -> Result<ReplicationOutcome> {
        let mut document = match self.source.fetch(&self.template).await {
            Ok(document) => document,
            Err(e) => match self.failure {
                ReplicationFailure::Abort => return Err(e),
                ReplicationFailure::LogAndContinue => {
                    tracing::warn!(
                        target_stack = %self.target,
                        "skipping deployment settings replication: {}",
                        e
                    );
                    return Ok(ReplicationOutcome::Skipped {
                        reason: e.to_string(),
                    });
                }
            },
        };

        if self.rewrite_branch && self.target.stack != self.template.stack {
            document.set_git_branch(format!("refs/heads/{}", self.target.stack));
        }
        if let Some(patch) = &self.override_patch {
            document.merge(patch);
        }

        let settings = self.provisioner.declare(self.declaration(&document))?;
        tracing::info!(
            target_stack = %self.target,
            template = %self.template,
            "declared replicated deployment settings"
        );

        if let Some(patch) = &self.cache_patch {
            if let Err(e) = patch.patch(
                &self.instance,
                &self.target,
                &document,
                &settings,
                self.options.clone(),
            ) {
                tracing::warn!(target_stack = %self.target, "legacy cache-options patch failed: {}", e);
            }
        }

        Ok(ReplicationOutcome::Replicated {
            settings,
            branch: document.git_branch().map(str::to_string),
        })
    }

    fn declaration(&self, document: &DeploymentSettingsDocument) -> Declaration {
        let mut environment_variables = document.environment_variables();
        environment_variables.insert(self.token_env.clone(), self.token.expose().to_string());

        let args = DeploymentSettingsArgs {
            organization: self.target.organization.clone(),
            project: self.target.project.clone(),
            stack: self.target.stack.clone(),
            github: document.github().cloned(),
            operation_context: OperationContextArgs {
                environment_variables,
            },
            source_context: document.source_context().cloned(),
        };
        Declaration::new(
            ResourceKind::DeploymentSettings,
            format!("{}-{}", self.instance, SUFFIX),
            &args,
            self.options.clone().retain_on_delete(),
        )
        .with_secret(format!(
            "/operationContext/environmentVariables/{}",
            escape_pointer(&self.token_env)
        ))
    }
}

/// Escape a key for use as a JSON pointer segment.
fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Handle to a running replication.
///
/// Consuming [`ReplicationTask::outcome`] is the only way to read the result,
/// so it is observed at most once by the caller; the task has already logged
/// it either way.
#[derive(Debug)]
pub struct ReplicationTask {
    handle: JoinHandle<Result<ReplicationOutcome>>,
}

impl ReplicationTask {
    /// Spawn `replicator` on the current tokio runtime.
    pub fn spawn(replicator: Replicator) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PolicyError::NoRuntime)?;
        let target = replicator.target.clone();
        let handle = runtime.spawn(async move {
            let outcome = replicator.run().await;
            match &outcome {
                Ok(ReplicationOutcome::Replicated { .. }) => {
                    tracing::debug!(target_stack = %target, "replication finished");
                }
                Ok(ReplicationOutcome::Skipped { .. }) => {}
                Err(e) => {
                    tracing::error!(target_stack = %target, "deployment settings replication failed: {}", e);
                }
            }
            outcome
        });
        Ok(Self { handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the replication to finish.
    pub async fn outcome(self) -> Result<ReplicationOutcome> {
        self.handle
            .await
            .map_err(|e| PolicyError::ReplicationTask(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ExecutionContext;
    use crate::provision::RecordingProvisioner;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedSource(Option<serde_json::Value>);

    #[async_trait]
    impl SettingsSource for FixedSource {
        async fn fetch(&self, stack: &StackIdentity) -> Result<DeploymentSettingsDocument> {
            match &self.0 {
                Some(value) => DeploymentSettingsDocument::try_from(value.clone()).map_err(|reason| {
                    PolicyError::MalformedSettings {
                        stack_path: stack.path(),
                        reason,
                    }
                }),
                None => Err(PolicyError::RemoteFetch {
                    stack_path: stack.path(),
                    detail: "stack not found".to_string(),
                }),
            }
        }
    }

    fn template_settings() -> serde_json::Value {
        json!({
            "operationContext": {"environmentVariables": {"REGION": "us-east-1"}},
            "sourceContext": {"git": {"branch": "refs/heads/main", "repoDir": "infra"}},
            "gitHub": {"repository": "initech/simple", "deployCommits": true, "previewPullRequests": true},
            "source": "github",
            "cacheOptions": {"enable": false}
        })
    }

    fn replicator(
        stack: &str,
        source: FixedSource,
        failure: ReplicationFailure,
        provisioner: Arc<RecordingProvisioner>,
    ) -> Replicator {
        let context = ExecutionContext::new("simple", stack).with_access_token("pul-123");
        let target = StackIdentity::resolve("initech", &context);
        Replicator {
            instance: "my-settings".to_string(),
            template: target.sibling("dev"),
            target,
            token: context.resolve_access_token(),
            token_env: "PULUMI_ACCESS_TOKEN".to_string(),
            rewrite_branch: true,
            failure,
            override_patch: None,
            options: ResourceOptions::default().with_parent("urn:component"),
            source: Arc::new(source),
            provisioner,
            cache_patch: None,
        }
    }

    #[tokio::test]
    async fn replicates_with_branch_rewrite_and_token() {
        let recorder = Arc::new(RecordingProvisioner::new());
        let outcome = replicator(
            "feature-x",
            FixedSource(Some(template_settings())),
            ReplicationFailure::Abort,
            recorder.clone(),
        )
        .run()
        .await
        .unwrap();

        match outcome {
            ReplicationOutcome::Replicated { settings, branch } => {
                assert_eq!(settings.name, "my-settings-deployment-settings");
                assert_eq!(branch.as_deref(), Some("refs/heads/feature-x"));
            }
            other => panic!("expected Replicated, got {:?}", other),
        }

        let declared = recorder.of_kind(ResourceKind::DeploymentSettings);
        assert_eq!(declared.len(), 1);
        let decl = &declared[0];
        assert!(decl.options.retain_on_delete);
        assert_eq!(decl.properties["stack"], "feature-x");
        assert_eq!(
            decl.properties["sourceContext"]["git"]["branch"],
            "refs/heads/feature-x"
        );
        assert_eq!(decl.properties["sourceContext"]["git"]["repoDir"], "infra");
        assert_eq!(decl.properties["github"]["repository"], "initech/simple");
        let vars = &decl.properties["operationContext"]["environmentVariables"];
        assert_eq!(vars["PULUMI_ACCESS_TOKEN"], "pul-123");
        assert_eq!(vars["REGION"], "us-east-1");
        assert_eq!(
            decl.redacted().properties["operationContext"]["environmentVariables"]
                ["PULUMI_ACCESS_TOKEN"],
            "[secret]"
        );
    }

    #[tokio::test]
    async fn template_stack_keeps_its_branch() {
        let recorder = Arc::new(RecordingProvisioner::new());
        let outcome = replicator(
            "dev",
            FixedSource(Some(template_settings())),
            ReplicationFailure::Abort,
            recorder.clone(),
        )
        .run()
        .await
        .unwrap();
        assert!(matches!(
            outcome,
            ReplicationOutcome::Replicated { branch: Some(ref b), .. } if b == "refs/heads/main"
        ));
    }

    #[tokio::test]
    async fn rewrite_can_be_disabled() {
        let recorder = Arc::new(RecordingProvisioner::new());
        let mut r = replicator(
            "feature-x",
            FixedSource(Some(template_settings())),
            ReplicationFailure::Abort,
            recorder.clone(),
        );
        r.rewrite_branch = false;
        r.run().await.unwrap();
        let decl = &recorder.of_kind(ResourceKind::DeploymentSettings)[0];
        assert_eq!(decl.properties["sourceContext"]["git"]["branch"], "refs/heads/main");
    }

    #[tokio::test]
    async fn override_is_merged_after_rewrite() {
        let recorder = Arc::new(RecordingProvisioner::new());
        let mut r = replicator(
            "feature-x",
            FixedSource(Some(template_settings())),
            ReplicationFailure::Abort,
            recorder.clone(),
        );
        r.override_patch = Some(json!({"sourceContext": {"git": {"branch": "refs/heads/pinned"}}}));
        r.run().await.unwrap();
        let decl = &recorder.of_kind(ResourceKind::DeploymentSettings)[0];
        assert_eq!(decl.properties["sourceContext"]["git"]["branch"], "refs/heads/pinned");
    }

    #[tokio::test]
    async fn abort_surfaces_fetch_error() {
        let recorder = Arc::new(RecordingProvisioner::new());
        let err = replicator("feature-x", FixedSource(None), ReplicationFailure::Abort, recorder.clone())
            .run()
            .await
            .unwrap_err();
        match err {
            PolicyError::RemoteFetch { stack_path, detail } => {
                assert_eq!(stack_path, "initech/simple/dev");
                assert_eq!(detail, "stack not found");
            }
            other => panic!("expected RemoteFetch, got {:?}", other),
        }
        assert!(recorder.is_empty());
    }

    #[tokio::test]
    async fn log_and_continue_reports_skip() {
        let recorder = Arc::new(RecordingProvisioner::new());
        let outcome = replicator(
            "feature-x",
            FixedSource(None),
            ReplicationFailure::LogAndContinue,
            recorder.clone(),
        )
        .run()
        .await
        .unwrap();
        match outcome {
            ReplicationOutcome::Skipped { reason } => assert!(reason.contains("stack not found")),
            other => panic!("expected Skipped, got {:?}", other),
        }
        assert!(recorder.is_empty());
    }

    #[tokio::test]
    async fn spawned_task_reports_outcome() {
        let recorder = Arc::new(RecordingProvisioner::new());
        let task = ReplicationTask::spawn(replicator(
            "feature-x",
            FixedSource(None),
            ReplicationFailure::Abort,
            recorder,
        ))
        .unwrap();
        assert!(matches!(
            task.outcome().await,
            Err(PolicyError::RemoteFetch { .. })
        ));
    }

    #[test]
    fn spawn_without_runtime_fails() {
        let recorder = Arc::new(RecordingProvisioner::new());
        let err = ReplicationTask::spawn(replicator(
            "feature-x",
            FixedSource(None),
            ReplicationFailure::Abort,
            recorder,
        ))
        .unwrap_err();
        assert!(matches!(err, PolicyError::NoRuntime));
    }

    struct FailingPatch;

    impl LegacyCachePatch for FailingPatch {
        fn patch(
            &self,
            instance: &str,
            _target: &StackIdentity,
            _document: &DeploymentSettingsDocument,
            _settings: &ResourceHandle,
            _options: ResourceOptions,
        ) -> Result<()> {
            Err(PolicyError::Provision {
                name: format!("{}-set-caching-option", instance),
                reason: "command runtime unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn failing_cache_patch_does_not_fail_replication() {
        let recorder = Arc::new(RecordingProvisioner::new());
        let mut r = replicator(
            "feature-x",
            FixedSource(Some(template_settings())),
            ReplicationFailure::Abort,
            recorder.clone(),
        );
        r.cache_patch = Some(Arc::new(FailingPatch));

        let outcome = r.run().await.unwrap();
        assert!(matches!(outcome, ReplicationOutcome::Replicated { .. }));
        assert_eq!(recorder.of_kind(ResourceKind::DeploymentSettings).len(), 1);
    }

    #[test]
    fn pointer_segments_are_escaped() {
        assert_eq!(escape_pointer("a/b~c"), "a~1b~0c");
    }
}
