// outputs.rs — Output advertisement through an environment document.
//
// The environment opens the current stack as `stackRef.<stack>` and exposes
// each listed output under `pulumiConfig`, so other stacks can consume them
// by importing `<stack>-outputs`. Output names are not validated.

use serde_yaml::{Mapping, Value};

use crate::concerns::Scope;
use crate::error::Result;
use crate::identity::StackIdentity;
use crate::resource::{Declaration, EnvironmentArgs, ResourceKind, ResourceOptions};

pub const SUFFIX: &str = "stack-env";

/// Name of the advertised environment for a stack.
pub fn environment_name(stack: &str) -> String {
    format!("{}-outputs", stack)
}

/// Render the environment document advertising `outputs` of `identity`.
pub fn environment_yaml(identity: &StackIdentity, outputs: &[String]) -> Result<String> {
    let stack = identity.stack.as_str();

    let mut stack_entry = Mapping::new();
    stack_entry.insert("stack".into(), identity.path().into());
    let mut stacks = Mapping::new();
    stacks.insert(stack.into(), Value::Mapping(stack_entry));
    let mut opener = Mapping::new();
    opener.insert("stacks".into(), Value::Mapping(stacks));
    let mut stack_ref = Mapping::new();
    stack_ref.insert("fn::open::pulumi-stacks".into(), Value::Mapping(opener));

    let mut config = Mapping::new();
    for output in outputs {
        config.insert(
            output.as_str().into(),
            format!("${{stackRef.{}.{}}}", stack, output).into(),
        );
    }

    let mut values = Mapping::new();
    values.insert("stackRef".into(), Value::Mapping(stack_ref));
    values.insert("pulumiConfig".into(), Value::Mapping(config));
    let mut root = Mapping::new();
    root.insert("values".into(), Value::Mapping(values));

    Ok(serde_yaml::to_string(&Value::Mapping(root))?)
}

pub fn plan(scope: &Scope<'_>, outputs: Option<&[String]>) -> Result<Option<Declaration>> {
    let Some(outputs) = outputs else {
        return Ok(None);
    };
    let identity = scope.identity;
    let args = EnvironmentArgs {
        organization: identity.organization.clone(),
        project: identity.project.clone(),
        name: environment_name(&identity.stack),
        yaml: environment_yaml(identity, outputs)?,
    };
    Ok(Some(Declaration::new(
        ResourceKind::Environment,
        scope.name(SUFFIX),
        &args,
        scope.options(ResourceOptions::default()),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concerns::testing::{identity, parent};

    fn parse(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn references_each_output_under_stack_block() {
        let id = identity("dev");
        let yaml = environment_yaml(&id, &["a".to_string(), "b".to_string()]).unwrap();
        let doc = parse(&yaml);

        let stacks = &doc["values"]["stackRef"]["fn::open::pulumi-stacks"]["stacks"];
        assert_eq!(stacks["dev"]["stack"], Value::from("initech/simple/dev"));

        let config = &doc["values"]["pulumiConfig"];
        assert_eq!(config["a"], Value::from("${stackRef.dev.a}"));
        assert_eq!(config["b"], Value::from("${stackRef.dev.b}"));
        assert!(yaml.contains("${stackRef.dev.a}"));
        assert!(yaml.contains("${stackRef.dev.b}"));
    }

    #[test]
    fn keeps_output_order() {
        let id = identity("dev");
        let yaml =
            environment_yaml(&id, &["zeta".to_string(), "alpha".to_string()]).unwrap();
        let zeta = yaml.find("stackRef.dev.zeta").unwrap();
        let alpha = yaml.find("stackRef.dev.alpha").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn empty_and_odd_names_still_serialize() {
        let id = identity("dev");
        let yaml = environment_yaml(
            &id,
            &["".to_string(), "has space".to_string(), "x: y".to_string()],
        )
        .unwrap();
        let doc = parse(&yaml);
        let config = &doc["values"]["pulumiConfig"];
        assert_eq!(config[""], Value::from("${stackRef.dev.}"));
        assert_eq!(config["has space"], Value::from("${stackRef.dev.has space}"));
        assert_eq!(config["x: y"], Value::from("${stackRef.dev.x: y}"));
    }

    #[test]
    fn plan_names_environment_after_stack() {
        let id = identity("dev");
        let options = parent();
        let scope = Scope {
            instance: "my-settings",
            identity: &id,
            options: &options,
        };
        let decl = plan(&scope, Some(&["myoutput".to_string()])).unwrap().unwrap();
        assert_eq!(decl.kind, ResourceKind::Environment);
        assert_eq!(decl.name, "my-settings-stack-env");
        assert_eq!(decl.properties["name"], "dev-outputs");
        assert_eq!(decl.properties["project"], "simple");
        assert!(decl.properties["yaml"]
            .as_str()
            .unwrap()
            .contains("${stackRef.dev.myoutput}"));
    }

    #[test]
    fn no_outputs_no_environment() {
        let id = identity("dev");
        let options = parent();
        let scope = Scope {
            instance: "s",
            identity: &id,
            options: &options,
        };
        assert!(plan(&scope, None).unwrap().is_none());
    }
}
