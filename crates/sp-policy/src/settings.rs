// settings.rs — Deployment settings documents and where they come from.
//
// The remote settings document is passed through almost untouched. Only
// `sourceContext.git.branch` is inspected or rewritten, so the document is
// kept as a JSON tree and fields this crate does not know survive the
// round trip.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::identity::StackIdentity;

/// Deployment settings of one stack as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct DeploymentSettingsDocument(Value);

impl TryFrom<Value> for DeploymentSettingsDocument {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        if value.is_object() {
            Ok(Self(value))
        } else {
            Err(format!("expected a JSON object, got {}", kind_of(&value)))
        }
    }
}

impl From<DeploymentSettingsDocument> for Value {
    fn from(document: DeploymentSettingsDocument) -> Self {
        document.0
    }
}

impl DeploymentSettingsDocument {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// `sourceContext.git.branch`, if present and a string.
    pub fn git_branch(&self) -> Option<&str> {
        self.0.pointer("/sourceContext/git/branch")?.as_str()
    }

    /// Rewrite `sourceContext.git.branch`, creating the path if needed.
    pub fn set_git_branch(&mut self, branch: impl Into<String>) {
        let Some(root) = self.0.as_object_mut() else {
            return;
        };
        if let Some(git) = child_object(root, "sourceContext").and_then(|sc| child_object(sc, "git"))
        {
            git.insert("branch".to_string(), Value::String(branch.into()));
        }
    }

    pub fn github(&self) -> Option<&Value> {
        self.0.get("gitHub")
    }

    pub fn source_context(&self) -> Option<&Value> {
        self.0.get("sourceContext")
    }

    /// String-valued `operationContext.environmentVariables`. Entries with
    /// non-string values (already-encrypted secrets) are dropped.
    pub fn environment_variables(&self) -> BTreeMap<String, String> {
        self.0
            .pointer("/operationContext/environmentVariables")
            .and_then(Value::as_object)
            .map(|vars| {
                vars.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Apply a JSON merge patch (RFC 7396). Non-object patches are ignored.
    pub fn merge(&mut self, patch: &Value) {
        if !patch.is_object() {
            tracing::warn!(
                "ignoring deployment settings override: expected an object, got {}",
                kind_of(patch)
            );
            return;
        }
        merge_patch(&mut self.0, patch);
    }
}

fn child_object<'a>(map: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut()
}

fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reads the deployment settings currently configured for a stack.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn fetch(&self, stack: &StackIdentity) -> Result<DeploymentSettingsDocument>;
}
