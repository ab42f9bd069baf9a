// plan.rs — Plan a policy bundle against a recording provisioner.
//
// Nothing is provisioned: declarations are captured and printed with
// secrets redacted. Replication still reads the template stack's settings
// from the service, so the printed plan includes the replicated document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, ValueEnum};
use serde::Serialize;
use sp_policy::{
    ApplicatorConfig, Declaration, PolicyApplicator, PolicyBundle, RecordingProvisioner,
    ReplicationOutcome, ResourceOptions, COMPONENT_TYPE,
};
use sp_service::{ServiceConfig, StackServiceClient};

#[derive(Args)]
pub struct PlanArgs {
    /// Policy bundle (YAML or JSON).
    #[arg(long)]
    pub bundle: PathBuf,
    /// Project name (defaults to $PULUMI_PROJECT).
    #[arg(long)]
    pub project: Option<String>,
    /// Stack name (defaults to $PULUMI_STACK).
    #[arg(long)]
    pub stack: Option<String>,
    /// Policy instance name; prefixes every declaration name.
    #[arg(long, default_value = "stack-settings")]
    pub name: String,
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// What `plan` prints.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub component: String,
    pub stack: String,
    pub replication: String,
    pub declarations: Vec<Declaration>,
}

pub fn load_bundle(path: &Path) -> anyhow::Result<PolicyBundle> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bundle {}", path.display()))?;
    // YAML is a superset of JSON, so one parser covers both.
    serde_yaml::from_str(&raw).with_context(|| format!("invalid bundle {}", path.display()))
}

pub fn render(report: &PlanReport, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Yaml => serde_yaml::to_string(report)?,
    })
}

fn describe(outcome: sp_policy::Result<ReplicationOutcome>) -> String {
    match outcome {
        Ok(ReplicationOutcome::Replicated { branch, .. }) => match branch {
            Some(branch) => format!("replicated (branch {})", branch),
            None => "replicated".to_string(),
        },
        Ok(ReplicationOutcome::Skipped { reason }) => format!("skipped: {}", reason),
        Err(e) => format!("failed: {}", e),
    }
}

pub async fn execute(args: &PlanArgs, config: ApplicatorConfig) -> anyhow::Result<()> {
    let bundle = load_bundle(&args.bundle)?;
    tracing::debug!(bundle = %args.bundle.display(), "loaded policy bundle");
    let context = super::context(&config, args.project.as_deref(), args.stack.as_deref());
    if context.stack.is_empty() || context.project.is_empty() {
        anyhow::bail!("no project/stack: pass --project and --stack or set PULUMI_PROJECT and PULUMI_STACK");
    }

    let client = StackServiceClient::new(ServiceConfig::from_applicator(
        &config,
        context.resolve_access_token(),
    ))?;
    let recorder = Arc::new(RecordingProvisioner::new());
    let applicator = PolicyApplicator::new(config, recorder.clone(), Arc::new(client));

    let applied = applicator.apply(&args.name, &bundle, &context, &ResourceOptions::default())?;
    let replication = match applied.replication {
        Some(task) => describe(task.outcome().await),
        None => "not replicated (review stack)".to_string(),
    };

    let report = PlanReport {
        component: format!("{} {}", COMPONENT_TYPE, args.name),
        stack: applied.identity.path(),
        replication,
        declarations: recorder
            .declarations()
            .iter()
            .map(Declaration::redacted)
            .collect(),
    };
    println!("{}", render(&report, args.format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_policy::{DriftManagement, PolicyError};
    use std::io::Write;

    #[test]
    fn loads_yaml_bundle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "ttlHours: 8\ndriftManagement: true\nteamAssignment: Platform\nstackTags:\n  Foo: Bar\n"
        )
        .unwrap();
        let bundle = load_bundle(file.path()).unwrap();
        assert_eq!(bundle.ttl_hours, Some(8));
        assert_eq!(bundle.drift_management, Some(DriftManagement::Enabled(true)));
        assert_eq!(bundle.team_assignment.as_deref(), Some("Platform"));
    }

    #[test]
    fn loads_json_bundle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"stackOutputs\": [\"url\"]}}").unwrap();
        let bundle = load_bundle(file.path()).unwrap();
        assert_eq!(bundle.stack_outputs, Some(vec!["url".to_string()]));
    }

    #[test]
    fn missing_bundle_names_the_path() {
        let err = load_bundle(Path::new("/nonexistent/bundle.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/bundle.yaml"));
    }

    #[test]
    fn describes_each_outcome() {
        assert_eq!(
            describe(Ok(ReplicationOutcome::Skipped {
                reason: "offline".to_string()
            })),
            "skipped: offline"
        );
        assert_eq!(describe(Err(PolicyError::NoRuntime)).split(':').next(), Some("failed"));
    }

    #[test]
    fn renders_json_report() {
        let report = PlanReport {
            component: "c".to_string(),
            stack: "initech/simple/dev".to_string(),
            replication: "skipped".to_string(),
            declarations: Vec::new(),
        };
        let json: serde_json::Value =
            serde_json::from_str(&render(&report, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["stack"], "initech/simple/dev");
        assert!(render(&report, OutputFormat::Yaml)
            .unwrap()
            .contains("stack: initech/simple/dev"));
    }
}
