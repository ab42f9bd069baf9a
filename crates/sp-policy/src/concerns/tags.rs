// tags.rs — Stack tag planning.
//
// One declaration per tag, named from the lower-cased key and value.
// `%` and `-` inside a key or value are percent-escaped so the joined name
// stays unambiguous (`a-b`/`c` and `a`/`b-c` do not collide).
// Changing a value therefore yields a new record instead of mutating the old
// one; pruning superseded tag records is left to the runtime.

use std::collections::BTreeMap;

use crate::concerns::Scope;
use crate::resource::{Declaration, ResourceKind, ResourceOptions, StackTagArgs};

pub const SUFFIX: &str = "tag";

/// `<instance>-tag-<key>-<value>`, lower-cased, key and value escaped.
pub fn tag_name(instance: &str, key: &str, value: &str) -> String {
    format!(
        "{}-{}-{}-{}",
        instance,
        SUFFIX,
        escape_segment(key),
        escape_segment(value)
    )
}

fn escape_segment(segment: &str) -> String {
    segment
        .to_lowercase()
        .replace('%', "%25")
        .replace('-', "%2d")
}

pub fn plan(scope: &Scope<'_>, tags: Option<&BTreeMap<String, String>>) -> Vec<Declaration> {
    let Some(tags) = tags else {
        return Vec::new();
    };
    let identity = scope.identity;
    tags.iter()
        .map(|(key, value)| {
            let args = StackTagArgs {
                organization: identity.organization.clone(),
                project: identity.project.clone(),
                stack: identity.stack.clone(),
                name: key.clone(),
                value: value.clone(),
            };
            Declaration::new(
                ResourceKind::StackTag,
                tag_name(scope.instance, key, value),
                &args,
                scope.options(ResourceOptions::default()),
            )
        })
        .collect()
}
