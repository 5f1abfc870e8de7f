//! Built-in role table.
//!
//! A role maps `(subject, action, resource type)` to the [`AccessScope`] of
//! objects it grants. Organization roles are spelled `<role>:<org uuid>`.

use fleet_security::{
    AccessScope, Action, ResourceType, ScopeConstraint, ScopeFilter, pep_properties, resources,
};
use uuid::Uuid;

const ORGANIZATION_ADMIN: &str = "organization-admin";
const ORGANIZATION_MEMBER: &str = "organization-member";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Everything.
    Owner,
    /// Own workspaces and API keys; read and update own user.
    Member,
    /// Read users, groups, templates and workspaces.
    Auditor,
    /// All on templates; read workspaces, users and groups.
    TemplateAdmin,
    /// All on users and groups.
    UserAdmin,
    /// All on objects of one organization.
    OrganizationAdmin(Uuid),
    /// Read templates, groups and the organization itself; own workspaces
    /// within the organization.
    OrganizationMember(Uuid),
}

impl Role {
    /// Parse a stored role name. Unknown names yield `None` and grant nothing.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "owner" => Some(Self::Owner),
            "member" => Some(Self::Member),
            "auditor" => Some(Self::Auditor),
            "template-admin" => Some(Self::TemplateAdmin),
            "user-admin" => Some(Self::UserAdmin),
            _ => {
                let (base, org) = name.split_once(':')?;
                let org = Uuid::parse_str(org).ok()?;
                match base {
                    ORGANIZATION_ADMIN => Some(Self::OrganizationAdmin(org)),
                    ORGANIZATION_MEMBER => Some(Self::OrganizationMember(org)),
                    _ => None,
                }
            }
        }
    }

    /// Objects of type `resource` this role lets `subject_id` perform `action` on.
    #[must_use]
    pub fn scope(self, subject_id: Uuid, action: Action, resource: ResourceType) -> AccessScope {
        let read = action == Action::Read;
        match self {
            Self::Owner => AccessScope::allow_all(),
            Self::Member => {
                if resource == resources::WORKSPACE || resource == resources::API_KEY {
                    owned_by(subject_id)
                } else if resource == resources::USER
                    && matches!(action, Action::Read | Action::Update)
                {
                    id_is(subject_id)
                } else {
                    AccessScope::deny_all()
                }
            }
            Self::Auditor => grant_if(
                read && [
                    resources::USER,
                    resources::GROUP,
                    resources::TEMPLATE,
                    resources::WORKSPACE,
                ]
                .contains(&resource),
            ),
            Self::TemplateAdmin => grant_if(
                resource == resources::TEMPLATE
                    || (read
                        && [resources::WORKSPACE, resources::USER, resources::GROUP]
                            .contains(&resource)),
            ),
            Self::UserAdmin => {
                grant_if(resource == resources::USER || resource == resources::GROUP)
            }
            Self::OrganizationAdmin(org) => {
                AccessScope::single(ScopeConstraint::new(vec![org_is(org)]))
            }
            Self::OrganizationMember(org) => {
                if read
                    && [
                        resources::TEMPLATE,
                        resources::GROUP,
                        resources::ORGANIZATION,
                    ]
                    .contains(&resource)
                {
                    AccessScope::single(ScopeConstraint::new(vec![org_is(org)]))
                } else if resource == resources::WORKSPACE {
                    AccessScope::single(ScopeConstraint::new(vec![
                        org_is(org),
                        ScopeFilter::eq(pep_properties::OWNER_ID, subject_id),
                    ]))
                } else {
                    AccessScope::deny_all()
                }
            }
        }
    }
}

fn grant_if(granted: bool) -> AccessScope {
    if granted {
        AccessScope::allow_all()
    } else {
        AccessScope::deny_all()
    }
}

fn org_is(org: Uuid) -> ScopeFilter {
    ScopeFilter::eq(pep_properties::ORG_ID, org)
}

pub(crate) fn owned_by(user: Uuid) -> AccessScope {
    AccessScope::single(ScopeConstraint::new(vec![ScopeFilter::eq(
        pep_properties::OWNER_ID,
        user,
    )]))
}

pub(crate) fn id_is(id: Uuid) -> AccessScope {
    AccessScope::single(ScopeConstraint::new(vec![ScopeFilter::eq(
        pep_properties::RESOURCE_ID,
        id,
    )]))
}
