// applicator.rs — The stack policy applicator.
//
// Applying a policy instance:
//
// 1. Resolve the stack identity from the execution context.
// 2. Unless this is a review stack, spawn deployment-settings replication.
// 3. Plan and declare TTL, drift, team, tags and output advertisement.
//
// Steps 2 and 3 are independent: the synchronous concerns never wait for
// the replication task, and a failing replication does not undo them.
// Declarations from step 3 propagate provisioner errors unmodified.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::bundle::PolicyBundle;
use crate::concerns::{self, Scope};
use crate::config::ApplicatorConfig;
use crate::error::{PolicyError, Result};
use crate::identity::{ExecutionContext, StackIdentity};
use crate::legacy::{CommandCachePatch, LegacyCachePatch};
use crate::provision::Provisioner;
use crate::replication::{ReplicationTask, Replicator};
use crate::resource::{Declaration, ResourceHandle, ResourceOptions};
use crate::settings::SettingsSource;

/// Type token of the policy component.
pub const COMPONENT_TYPE: &str = "stack-policy:stack-management:StackSettings";

/// Result of applying one policy instance.
#[derive(Debug)]
pub struct AppliedPolicy {
    /// URN of the policy component; parent of every declaration.
    pub urn: String,
    pub identity: StackIdentity,
    /// Handles of the synchronously declared entities, in declaration order.
    pub resources: Vec<ResourceHandle>,
    /// Running replication, absent for review stacks.
    pub replication: Option<ReplicationTask>,
}

/// Applies policy bundles to stacks through a provisioner.
pub struct PolicyApplicator {
    config: ApplicatorConfig,
    provisioner: Arc<dyn Provisioner>,
    source: Arc<dyn SettingsSource>,
    cache_patch: Option<Arc<dyn LegacyCachePatch>>,
}

impl PolicyApplicator {
    /// Create an applicator. When `legacy_cache_patch` is enabled in
    /// `config`, the command-based cache patch is installed.
    pub fn new(
        config: ApplicatorConfig,
        provisioner: Arc<dyn Provisioner>,
        source: Arc<dyn SettingsSource>,
    ) -> Self {
        let cache_patch: Option<Arc<dyn LegacyCachePatch>> = if config.legacy_cache_patch {
            Some(Arc::new(CommandCachePatch::new(
                provisioner.clone(),
                config.api_url.clone(),
                config.token_env.clone(),
            )))
        } else {
            None
        };
        Self {
            config,
            provisioner,
            source,
            cache_patch,
        }
    }

    /// Replace the legacy cache patch (or install one regardless of config).
    pub fn with_cache_patch(mut self, patch: Arc<dyn LegacyCachePatch>) -> Self {
        self.cache_patch = Some(patch);
        self
    }

    pub fn config(&self) -> &ApplicatorConfig {
        &self.config
    }

    /// Apply `bundle` as the policy instance `name`.
    ///
    /// `options` are the caller's lifecycle hints; they are inherited by
    /// every declared entity. Needs an ambient tokio runtime unless the
    /// stack is a review stack.
    pub fn apply(
        &self,
        name: &str,
        bundle: &PolicyBundle,
        context: &ExecutionContext,
        options: &ResourceOptions,
    ) -> Result<AppliedPolicy> {
        let identity = StackIdentity::resolve(&self.config.organization, context);
        let urn = format!("urn:{}::{}", COMPONENT_TYPE, name);
        let child_options = ResourceOptions::default()
            .with_parent(urn.clone())
            .merged_with(options);

        tracing::info!(policy = name, stack = %identity, "applying stack policy");

        let replication = if identity.is_review_stack(&self.config.review_prefix) {
            tracing::debug!(stack = %identity, "review stack, not replicating deployment settings");
            None
        } else {
            Some(ReplicationTask::spawn(Replicator {
                instance: name.to_string(),
                template: identity.sibling(&self.config.template_stack),
                target: identity.clone(),
                token: context.resolve_access_token(),
                token_env: self.config.token_env.clone(),
                rewrite_branch: self.config.rewrite_branch,
                failure: self.config.replication_failure,
                override_patch: bundle.deployment_settings_override.clone(),
                options: child_options.clone(),
                source: self.source.clone(),
                provisioner: self.provisioner.clone(),
                cache_patch: self.cache_patch.clone(),
            })?)
        };

        let scope = Scope {
            instance: name,
            identity: &identity,
            options: &child_options,
        };
        let resources = self.declare_all(self.plan(&scope, bundle)?)?;

        Ok(AppliedPolicy {
            urn,
            identity,
            resources,
            replication,
        })
    }

    /// Generic construct entry point: build a component by type token from
    /// raw JSON inputs.
    pub fn construct(
        &self,
        type_token: &str,
        name: &str,
        inputs: serde_json::Value,
        context: &ExecutionContext,
        options: &ResourceOptions,
    ) -> Result<AppliedPolicy> {
        if type_token != COMPONENT_TYPE {
            return Err(PolicyError::UnknownResourceType {
                type_token: type_token.to_string(),
            });
        }
        let bundle: PolicyBundle = serde_json::from_value(inputs)?;
        self.apply(name, &bundle, context, options)
    }

    /// Plan the synchronous concerns in a fixed order: TTL, drift, team,
    /// tags, outputs.
    fn plan(&self, scope: &Scope<'_>, bundle: &PolicyBundle) -> Result<Vec<Declaration>> {
        let default_ttl = self
            .config
            .apply_default_ttl
            .then(|| Duration::hours(i64::from(self.config.default_ttl_hours)));

        let mut planned = Vec::new();
        planned.extend(concerns::ttl::plan(scope, bundle.ttl(), default_ttl, Utc::now()));
        planned.extend(concerns::drift::plan(
            scope,
            bundle.drift_management,
            bundle.drift_schedule_cron.as_deref(),
            self.config.drift_scheduling,
        ));
        planned.extend(concerns::team::plan(scope, bundle.team_assignment.as_deref()));
        planned.extend(concerns::tags::plan(scope, bundle.stack_tags.as_ref()));
        planned.extend(concerns::outputs::plan(scope, bundle.stack_outputs.as_deref())?);
        Ok(planned)
    }

    fn declare_all(&self, planned: Vec<Declaration>) -> Result<Vec<ResourceHandle>> {
        planned
            .into_iter()
            .map(|declaration| {
                tracing::info!(kind = %declaration.kind, name = %declaration.name, "declaring");
                self.provisioner.declare(declaration)
            })
            .collect()
    }
}
