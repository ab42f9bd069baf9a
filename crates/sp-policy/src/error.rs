// error.rs — Error types for the policy applicator.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while applying a stack policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The stack-management service answered the settings read with a
    /// non-success status. `detail` is the response body, or empty when the
    /// body itself could not be read.
    #[error("failed to get deployment settings for stack, {stack_path}: {detail}")]
    RemoteFetch { stack_path: String, detail: String },

    /// The settings request never produced a response (connection refused,
    /// timeout, DNS failure).
    #[error("transport error fetching deployment settings for {stack_path}: {reason}")]
    Transport { stack_path: String, reason: String },

    /// The settings response was not a JSON object.
    #[error("malformed deployment settings for {stack_path}: {reason}")]
    MalformedSettings { stack_path: String, reason: String },

    /// The construct entry point was asked for a type it does not provide.
    #[error("unknown resource type '{type_token}'")]
    UnknownResourceType { type_token: String },

    /// Construct inputs could not be decoded into a policy bundle.
    #[error("invalid policy inputs: {0}")]
    InvalidInputs(#[from] serde_json::Error),

    /// The output-advertisement document could not be rendered.
    #[error("failed to render environment document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The provisioning runtime rejected a declaration.
    #[error("failed to declare '{name}': {reason}")]
    Provision { name: String, reason: String },

    /// Replication needs a tokio runtime to run on.
    #[error("no async runtime available for deployment-settings replication")]
    NoRuntime,

    /// The replication task panicked or was cancelled before reporting.
    #[error("replication task failed: {0}")]
    ReplicationTask(String),

    /// The applicator configuration file could not be read or parsed.
    #[error("invalid config at {path}: {reason}")]
    Config { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, PolicyError>;
