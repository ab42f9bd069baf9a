//! Applicator configuration structures

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

/// What happens when the template stack's settings cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplicationFailure {
    /// Surface the error through the replication task's outcome.
    Abort,
    /// Log the error and report the replication as skipped.
    #[default]
    LogAndContinue,
}

/// When a drift schedule is declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriftScheduling {
    /// Only when `driftManagement` asks for it.
    #[default]
    OptIn,
    /// Always; `driftManagement` only picks the remediation mode.
    Always,
}

/// Top-level applicator configuration from .stackpolicy/config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicatorConfig {
    /// Organization every governed stack belongs to.
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Stack whose deployment settings are replicated to new stacks.
    #[serde(default = "default_template_stack")]
    pub template_stack: String,

    /// Review stacks contain `<review_prefix>-<org>-<project>`.
    #[serde(default = "default_review_prefix")]
    pub review_prefix: String,

    /// Environment variable holding the service access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Base URL of the stack-management API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout for API calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub replication_failure: ReplicationFailure,

    /// Point replicated settings at `refs/heads/<stack>`.
    #[serde(default = "default_true")]
    pub rewrite_branch: bool,

    /// Post the replicated document straight to the API after declaring it.
    /// Stop-gap for cache options the declarative API does not cover yet.
    #[serde(default)]
    pub legacy_cache_patch: bool,

    #[serde(default)]
    pub drift_scheduling: DriftScheduling,

    /// Declare a TTL even when the bundle does not ask for one.
    #[serde(default = "default_true")]
    pub apply_default_ttl: bool,

    #[serde(default = "default_ttl_hours")]
    pub default_ttl_hours: u32,
}

impl Default for ApplicatorConfig {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            template_stack: default_template_stack(),
            review_prefix: default_review_prefix(),
            token_env: default_token_env(),
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            replication_failure: ReplicationFailure::default(),
            rewrite_branch: true,
            legacy_cache_patch: false,
            drift_scheduling: DriftScheduling::default(),
            apply_default_ttl: true,
            default_ttl_hours: default_ttl_hours(),
        }
    }
}

// Serde default functions
fn default_organization() -> String {
    "initech".to_string()
}

fn default_template_stack() -> String {
    "dev".to_string()
}

fn default_review_prefix() -> String {
    "pr".to_string()
}

fn default_token_env() -> String {
    "PULUMI_ACCESS_TOKEN".to_string()
}

fn default_api_url() -> String {
    "https://api.pulumi.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_ttl_hours() -> u32 {
    8
}

impl ApplicatorConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PolicyError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| PolicyError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Try to load config, returning default if the file doesn't exist or
    /// can't be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring config: {}", e);
                Self::default()
            }
        }
    }
}
