// resource.rs — Declarations issued to the provisioning runtime.
//
// A declaration is (kind, name, properties, lifecycle hints). Properties are
// built from the typed `*Args` structs below and carried as JSON so the
// provisioner seam stays kind-agnostic.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kinds of entity the applicator declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    TtlSchedule,
    DriftSchedule,
    TeamStackPermission,
    StackTag,
    Environment,
    DeploymentSettings,
    /// Raw external command. Only used by the legacy cache-options patch.
    Command,
}

impl ResourceKind {
    /// Type token understood by the provisioning runtime.
    pub fn type_token(&self) -> &'static str {
        match self {
            ResourceKind::TtlSchedule => "pulumiservice:index:TtlSchedule",
            ResourceKind::DriftSchedule => "pulumiservice:index:DriftSchedule",
            ResourceKind::TeamStackPermission => "pulumiservice:index:TeamStackPermission",
            ResourceKind::StackTag => "pulumiservice:index:StackTag",
            ResourceKind::Environment => "pulumiservice:index:Environment",
            ResourceKind::DeploymentSettings => "pulumiservice:index:DeploymentSettings",
            ResourceKind::Command => "command:local:Command",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_token())
    }
}

/// Lifecycle hints attached to a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Property names whose changes are never treated as drift.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_changes: Vec<String>,

    /// The remote entity survives removal of the declaring policy.
    #[serde(default)]
    pub retain_on_delete: bool,
}

impl ResourceOptions {
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn depends_on(mut self, urn: impl Into<String>) -> Self {
        self.depends_on.push(urn.into());
        self
    }

    pub fn ignore_changes(mut self, property: impl Into<String>) -> Self {
        self.ignore_changes.push(property.into());
        self
    }

    pub fn retain_on_delete(mut self) -> Self {
        self.retain_on_delete = true;
        self
    }

    /// Merge caller-supplied options into a child's options.
    ///
    /// The child's own parent wins; dependency and ignore lists are unioned;
    /// retention is kept if either side asks for it.
    pub fn merged_with(mut self, inherited: &ResourceOptions) -> Self {
        if self.parent.is_none() {
            self.parent = inherited.parent.clone();
        }
        for dep in &inherited.depends_on {
            if !self.depends_on.contains(dep) {
                self.depends_on.push(dep.clone());
            }
        }
        for prop in &inherited.ignore_changes {
            if !self.ignore_changes.contains(prop) {
                self.ignore_changes.push(prop.clone());
            }
        }
        self.retain_on_delete |= inherited.retain_on_delete;
        self
    }
}

/// A single declaration handed to the provisioner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    pub kind: ResourceKind,
    pub name: String,
    pub properties: serde_json::Value,
    pub options: ResourceOptions,
    /// JSON pointers into `properties` whose values are secrets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_paths: Vec<String>,
}

impl Declaration {
    pub fn new<A: Serialize>(
        kind: ResourceKind,
        name: impl Into<String>,
        args: &A,
        options: ResourceOptions,
    ) -> Self {
        let name = name.into();
        // The *Args structs only hold strings, bools, maps and JSON values,
        // none of which can fail to serialize.
        let properties = serde_json::to_value(args).unwrap_or_else(|e| {
            tracing::error!(name = %name, "failed to serialize properties: {}", e);
            serde_json::Value::Null
        });
        Self {
            kind,
            name,
            properties,
            options,
            secret_paths: Vec::new(),
        }
    }

    pub fn with_secret(mut self, pointer: impl Into<String>) -> Self {
        self.secret_paths.push(pointer.into());
        self
    }

    /// A copy with every secret path replaced by `[secret]`.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for pointer in &self.secret_paths {
            if let Some(value) = copy.properties.pointer_mut(pointer) {
                *value = serde_json::Value::String("[secret]".to_string());
            }
        }
        copy
    }
}

/// Handle returned by the provisioner for a declared entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub name: String,
    pub urn: String,
}

// ── Typed properties ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtlScheduleArgs {
    pub organization: String,
    pub project: String,
    pub stack: String,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub timestamp: String,
    pub delete_after_destroy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftScheduleArgs {
    pub organization: String,
    pub project: String,
    pub stack: String,
    pub schedule_cron: String,
    pub auto_remediate: bool,
}

/// Permission scope granted to a team on a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamStackPermissionScope {
    Read,
    Edit,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStackPermissionArgs {
    pub organization: String,
    pub project: String,
    pub stack: String,
    pub team: String,
    pub permission: TeamStackPermissionScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTagArgs {
    pub organization: String,
    pub project: String,
    pub stack: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentArgs {
    pub organization: String,
    pub project: String,
    pub name: String,
    pub yaml: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContextArgs {
    pub environment_variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSettingsArgs {
    pub organization: String,
    pub project: String,
    pub stack: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<serde_json::Value>,
    pub operation_context: OperationContextArgs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandArgs {
    pub create: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_options_union_lists_and_keep_retention() {
        let inherited = ResourceOptions::default()
            .with_parent("caller")
            .depends_on("urn:a")
            .ignore_changes("yaml")
            .retain_on_delete();
        let child = ResourceOptions::default()
            .with_parent("component")
            .depends_on("urn:a")
            .depends_on("urn:b")
            .ignore_changes("timestamp");

        let merged = child.merged_with(&inherited);
        assert_eq!(merged.parent.as_deref(), Some("component"));
        assert_eq!(merged.depends_on, vec!["urn:a", "urn:b"]);
        assert_eq!(merged.ignore_changes, vec!["timestamp", "yaml"]);
        assert!(merged.retain_on_delete);
    }

    #[test]
    fn redacted_hides_secret_paths_only() {
        let args = DeploymentSettingsArgs {
            organization: "initech".to_string(),
            project: "simple".to_string(),
            stack: "dev".to_string(),
            github: None,
            operation_context: OperationContextArgs {
                environment_variables: BTreeMap::from([
                    ("PULUMI_ACCESS_TOKEN".to_string(), "pul-secret".to_string()),
                    ("REGION".to_string(), "us-east-1".to_string()),
                ]),
            },
            source_context: None,
        };
        let decl = Declaration::new(
            ResourceKind::DeploymentSettings,
            "x-deployment-settings",
            &args,
            ResourceOptions::default(),
        )
        .with_secret("/operationContext/environmentVariables/PULUMI_ACCESS_TOKEN");

        let redacted = decl.redacted();
        let vars = &redacted.properties["operationContext"]["environmentVariables"];
        assert_eq!(vars["PULUMI_ACCESS_TOKEN"], "[secret]");
        assert_eq!(vars["REGION"], "us-east-1");
        assert_eq!(
            decl.properties["operationContext"]["environmentVariables"]["PULUMI_ACCESS_TOKEN"],
            "pul-secret"
        );
    }

    #[test]
    fn team_scope_serializes_lowercase() {
        let json = serde_json::to_string(&TeamStackPermissionScope::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
    }
}
