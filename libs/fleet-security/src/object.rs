//! Authorizable objects and the actions performed on them.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access_scope::{ScopeValue, pep_properties};

/// The category of operation requested on an [`Object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Self::Create, Self::Read, Self::Update, Self::Delete];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static descriptor for an authorizable resource type.
///
/// Constants live in [`resources`]; the helpers build [`Object`]s for
/// rows that do not exist yet (inserts) or for coarse-grained checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceType {
    pub name: &'static str,
}

impl ResourceType {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// An object of this type with no id, owner or organization.
    #[must_use]
    pub fn object(self) -> Object {
        Object {
            resource_type: self,
            id: None,
            owner_id: None,
            org_id: None,
        }
    }

    #[must_use]
    pub fn in_org(self, org_id: Uuid) -> Object {
        self.object().in_org(org_id)
    }

    #[must_use]
    pub fn with_owner(self, owner_id: Uuid) -> Object {
        self.object().with_owner(owner_id)
    }

    #[must_use]
    pub fn with_id(self, id: Uuid) -> Object {
        self.object().with_id(id)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Resource types known to the policy engine.
///
/// Workspace builds, agents, resources and apps have no type of their own:
/// they are authorized through the workspace that owns them.
pub mod resources {
    use super::ResourceType;

    pub const API_KEY: ResourceType = ResourceType::new("api_key");
    pub const GROUP: ResourceType = ResourceType::new("group");
    pub const USER: ResourceType = ResourceType::new("user");
    pub const ORGANIZATION: ResourceType = ResourceType::new("organization");
    pub const WORKSPACE: ResourceType = ResourceType::new("workspace");
    pub const PROVISIONER_JOB: ResourceType = ResourceType::new("provisioner_job");
    pub const TEMPLATE: ResourceType = ResourceType::new("template");
    /// Deployment-internal state (replicas, mesh keys, telemetry reads).
    pub const SYSTEM: ResourceType = ResourceType::new("system");
}

/// An authorizable resource reference.
///
/// Input to the policy engine only; never persisted. Built from the
/// persisted row (see [`Objecter`]) so ownership cannot be forged by
/// request payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Object {
    resource_type: ResourceType,
    id: Option<Uuid>,
    owner_id: Option<Uuid>,
    org_id: Option<Uuid>,
}

impl Object {
    #[must_use]
    pub fn in_org(mut self, org_id: Uuid) -> Self {
        self.org_id = Some(org_id);
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    #[must_use]
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    #[must_use]
    pub fn owner_id(&self) -> Option<Uuid> {
        self.owner_id
    }

    #[must_use]
    pub fn org_id(&self) -> Option<Uuid> {
        self.org_id
    }

    /// Look up a property by its [`pep_properties`] name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<ScopeValue> {
        let value = match name {
            pep_properties::RESOURCE_ID => self.id,
            pep_properties::OWNER_ID => self.owner_id,
            pep_properties::ORG_ID => self.org_id,
            _ => None,
        };
        value.map(ScopeValue::Uuid)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource_type)?;
        if let Some(id) = self.id {
            write!(f, ":{id}")?;
        }
        if let Some(org) = self.org_id {
            write!(f, " org={org}")?;
        }
        if let Some(owner) = self.owner_id {
            write!(f, " owner={owner}")?;
        }
        Ok(())
    }
}

/// Anything that can be evaluated by the policy engine.
pub trait Objecter {
    fn object(&self) -> Object;
}

impl Objecter for Object {
    fn object(&self) -> Object {
        self.clone()
    }
}
