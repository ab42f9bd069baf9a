// error.rs — Error types for the stack-management service client.

use sp_policy::PolicyError;
use thiserror::Error;

/// Errors from stack-management service calls.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never produced a response.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The service answered with a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The response body was not the expected JSON.
    #[error("failed to decode response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },

    /// The client could not be built (bad token characters, TLS setup).
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ServiceError {
    /// Map onto the applicator's error for the settings read of `stack_path`.
    pub fn into_policy_error(self, stack_path: String) -> PolicyError {
        match self {
            ServiceError::Api { body, .. } => PolicyError::RemoteFetch {
                stack_path,
                detail: body,
            },
            ServiceError::Http { source, .. } => PolicyError::Transport {
                stack_path,
                reason: source.to_string(),
            },
            ServiceError::Deserialization { reason, .. } => PolicyError::MalformedSettings {
                stack_path,
                reason,
            },
            ServiceError::Client(reason) => PolicyError::Transport { stack_path, reason },
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
