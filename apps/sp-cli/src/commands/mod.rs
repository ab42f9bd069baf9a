pub mod plan;
pub mod settings;

use sp_policy::{ApplicatorConfig, ExecutionContext};

/// Execution context from the environment, with flag overrides.
pub fn context(
    config: &ApplicatorConfig,
    project: Option<&str>,
    stack: Option<&str>,
) -> ExecutionContext {
    let mut context = ExecutionContext::from_env(&config.token_env);
    if let Some(project) = project {
        context.project = project.to_string();
    }
    if let Some(stack) = stack {
        context.stack = stack.to_string();
    }
    context
}
