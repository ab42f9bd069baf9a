// identity.rs — Stack identity and execution context resolution.
//
// Every concern keys its declarations on (organization, project, stack).
// The organization is fixed per deployment (configuration); project and
// stack come from the execution context, which is passed in explicitly
// rather than read from process-wide state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value substituted when no access token is available. Intentionally
/// invalid: downstream calls made with it fail visibly.
pub const MISSING_TOKEN_SENTINEL: &str = "notokenfound";

/// Environment variable holding the current project name.
pub const PROJECT_ENV: &str = "PULUMI_PROJECT";

/// Environment variable holding the current stack name.
pub const STACK_ENV: &str = "PULUMI_STACK";

/// The ambient facts a policy application runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub project: String,
    pub stack: String,
    /// Raw access token, if the caller already has one.
    pub access_token: Option<String>,
}

impl ExecutionContext {
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            stack: stack.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Build a context from `PULUMI_PROJECT` / `PULUMI_STACK` and the given
    /// token variable. Missing project or stack resolve to empty strings.
    pub fn from_env(token_env: &str) -> Self {
        Self {
            project: std::env::var(PROJECT_ENV).unwrap_or_default(),
            stack: std::env::var(STACK_ENV).unwrap_or_default(),
            access_token: std::env::var(token_env).ok().filter(|t| !t.is_empty()),
        }
    }

    /// Resolve the access token, falling back to the sentinel.
    pub fn resolve_access_token(&self) -> AccessToken {
        match self.access_token.as_deref() {
            Some(token) if !token.is_empty() => AccessToken(token.to_string()),
            _ => AccessToken(MISSING_TOKEN_SENTINEL.to_string()),
        }
    }
}

/// Fully-qualified identity of the stack being governed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackIdentity {
    pub organization: String,
    pub project: String,
    pub stack: String,
}

impl StackIdentity {
    pub fn resolve(organization: &str, context: &ExecutionContext) -> Self {
        Self {
            organization: organization.to_string(),
            project: context.project.clone(),
            stack: context.stack.clone(),
        }
    }

    /// `org/project/stack`.
    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.organization, self.project, self.stack)
    }

    /// The same organization and project, a different stack.
    pub fn sibling(&self, stack: &str) -> Self {
        Self {
            organization: self.organization.clone(),
            project: self.project.clone(),
            stack: stack.to_string(),
        }
    }

    /// Marker embedded in the names of per-pull-request review stacks.
    pub fn review_marker(&self, review_prefix: &str) -> String {
        format!("{}-{}-{}", review_prefix, self.organization, self.project)
    }

    /// Review stacks are ephemeral and are left out of settings replication.
    pub fn is_review_stack(&self, review_prefix: &str) -> bool {
        self.stack.contains(&self.review_marker(review_prefix))
    }
}

impl fmt::Display for StackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Access credential for the stack-management service.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == MISSING_TOKEN_SENTINEL
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sentinel() {
            write!(f, "AccessToken(<missing>)")
        } else {
            write!(f, "AccessToken(<redacted>)")
        }
    }
}
