// team.rs — Team stack permission planning.
//
// The grant is retained on delete: removing the policy leaves the team's
// access in place. No team is assigned when none is named.

use crate::concerns::Scope;
use crate::resource::{
    Declaration, ResourceKind, ResourceOptions, TeamStackPermissionArgs, TeamStackPermissionScope,
};

pub const SUFFIX: &str = "team-stack-assign";

pub fn plan(scope: &Scope<'_>, team: Option<&str>) -> Option<Declaration> {
    let team = team?;
    let identity = scope.identity;
    let args = TeamStackPermissionArgs {
        organization: identity.organization.clone(),
        project: identity.project.clone(),
        stack: identity.stack.clone(),
        team: team.to_string(),
        permission: TeamStackPermissionScope::Admin,
    };
    Some(Declaration::new(
        ResourceKind::TeamStackPermission,
        scope.name(SUFFIX),
        &args,
        scope.options(ResourceOptions::default().retain_on_delete()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concerns::testing::{identity, parent};

    #[test]
    fn grants_admin_and_retains() {
        let id = identity("dev");
        let options = parent();
        let scope = Scope {
            instance: "my-settings",
            identity: &id,
            options: &options,
        };
        let decl = plan(&scope, Some("Platform")).unwrap();
        assert_eq!(decl.kind, ResourceKind::TeamStackPermission);
        assert_eq!(decl.name, "my-settings-team-stack-assign");
        assert_eq!(decl.properties["team"], "Platform");
        assert_eq!(decl.properties["permission"], "admin");
        assert!(decl.options.retain_on_delete);
    }

    #[test]
    fn no_team_no_grant() {
        let id = identity("dev");
        let options = parent();
        let scope = Scope {
            instance: "s",
            identity: &id,
            options: &options,
        };
        assert!(plan(&scope, None).is_none());
    }
}
