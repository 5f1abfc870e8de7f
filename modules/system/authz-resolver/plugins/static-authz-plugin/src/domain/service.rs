//! Service implementation for the static `AuthZ` resolver plugin.

use fleet_security::{AccessScope, Action, Object, ResourceType, Scope, Subject, resources};

use super::roles::{Role, id_is};
use crate::config::AuthZMode;

/// Static `AuthZ` resolver service.
///
/// In `builtin_roles` mode the scope is the union of every recognised role's
/// grant, intersected with the subject's [`Scope`] restriction.
#[derive(Debug, Default)]
pub struct Service {
    mode: AuthZMode,
}

impl Service {
    #[must_use]
    pub fn new(mode: AuthZMode) -> Self {
        Self { mode }
    }

    /// Objects of `resource` that `subject` may perform `action` on.
    #[must_use]
    pub fn scope_for(
        &self,
        subject: &Subject,
        action: Action,
        resource: ResourceType,
    ) -> AccessScope {
        let granted = match self.mode {
            AuthZMode::AllowAll => AccessScope::allow_all(),
            AuthZMode::BuiltinRoles => subject
                .roles()
                .iter()
                .filter_map(|name| Role::parse(name))
                .map(|role| role.scope(subject.id(), action, resource))
                .fold(AccessScope::deny_all(), AccessScope::union),
        };
        granted.intersect(&restriction(subject.scope(), action, resource))
    }

    /// Point check: the object must fall inside [`Service::scope_for`].
    #[must_use]
    pub fn allows(&self, subject: &Subject, action: Action, object: &Object) -> bool {
        self.scope_for(subject, action, object.resource_type())
            .matches(object)
    }
}

/// What a scoped subject is limited to, regardless of its roles.
fn restriction(scope: Scope, action: Action, resource: ResourceType) -> AccessScope {
    match scope {
        Scope::All => AccessScope::allow_all(),
        Scope::WorkspaceAgent {
            workspace_id,
            owner_id,
        } => {
            if resource == resources::WORKSPACE
                && matches!(action, Action::Read | Action::Update)
            {
                id_is(workspace_id)
            } else if resource == resources::USER && action == Action::Read {
                id_is(owner_id)
            } else {
                AccessScope::deny_all()
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn uuid(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    const USER: &str = "11111111-1111-1111-1111-111111111111";
    const ORG: &str = "22222222-2222-2222-2222-222222222222";
    const WORKSPACE: &str = "33333333-3333-3333-3333-333333333333";
    const OTHER_WORKSPACE: &str = "44444444-4444-4444-4444-444444444444";

    fn workspace(id: &str) -> Object {
        resources::WORKSPACE
            .with_id(uuid(id))
            .with_owner(uuid(USER))
            .in_org(uuid(ORG))
    }

    fn owner() -> Subject {
        Subject::builder(uuid(USER))
            .roles(vec!["member".to_owned(), format!("organization-member:{ORG}")])
            .build()
    }

    fn agent() -> Subject {
        Subject::builder(uuid(USER))
            .roles(["owner"])
            .scope(Scope::workspace_agent(uuid(WORKSPACE), uuid(USER)))
            .build()
    }

    #[test]
    fn owner_reads_all_own_workspaces() {
        let service = Service::default();
        assert!(service.allows(&owner(), Action::Read, &workspace(WORKSPACE)));
        assert!(service.allows(&owner(), Action::Delete, &workspace(OTHER_WORKSPACE)));
    }

    #[test]
    fn agent_scope_limited_to_one_workspace() {
        let service = Service::default();
        let agent = agent();
        assert!(service.allows(&agent, Action::Read, &workspace(WORKSPACE)));
        assert!(service.allows(&agent, Action::Update, &workspace(WORKSPACE)));
        assert!(!service.allows(&agent, Action::Read, &workspace(OTHER_WORKSPACE)));
        assert!(!service.allows(&agent, Action::Delete, &workspace(WORKSPACE)));
    }

    #[test]
    fn agent_reads_only_its_owner() {
        let service = Service::default();
        let agent = agent();
        let me = resources::USER.with_id(uuid(USER)).with_owner(uuid(USER));
        let other = resources::USER.with_id(Uuid::new_v4());
        assert!(service.allows(&agent, Action::Read, &me));
        assert!(!service.allows(&agent, Action::Update, &me));
        assert!(!service.allows(&agent, Action::Read, &other));
        let template = resources::TEMPLATE.in_org(uuid(ORG));
        assert!(!service.allows(&agent, Action::Read, &template));
    }

    #[test]
    fn subject_without_roles_is_denied() {
        let service = Service::default();
        let nobody = Subject::builder(uuid(USER)).build();
        assert!(!service.allows(&nobody, Action::Read, &workspace(WORKSPACE)));
        assert!(
            service
                .scope_for(&nobody, Action::Read, resources::WORKSPACE)
                .is_deny_all()
        );
    }

    #[test]
    fn allow_all_still_honors_agent_scope() {
        let service = Service::new(AuthZMode::AllowAll);
        let agent = agent();
        assert!(service.allows(&agent, Action::Read, &workspace(WORKSPACE)));
        assert!(!service.allows(&agent, Action::Read, &workspace(OTHER_WORKSPACE)));
        let nobody = Subject::builder(Uuid::new_v4()).build();
        assert!(service.allows(&nobody, Action::Delete, &workspace(WORKSPACE)));
    }

    #[test]
    fn filter_and_point_check_agree() {
        let service = Service::default();
        let subject = owner();
        let scope = service.scope_for(&subject, Action::Read, resources::WORKSPACE);
        for object in [
            workspace(WORKSPACE),
            resources::WORKSPACE.with_owner(Uuid::new_v4()),
        ] {
            assert_eq!(
                scope.matches(&object),
                service.allows(&subject, Action::Read, &object)
            );
        }
    }
}
