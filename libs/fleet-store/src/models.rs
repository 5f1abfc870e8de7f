//! Persisted records and the parameter structs accepted by [`Store`](crate::Store).
//!
//! Every record implements [`Objecter`] so the authorization layer derives
//! policy input from persisted state rather than from request payloads.

use fleet_security::{AgentToken, Object, Objecter, resources};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// ── Users & organizations ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub status: UserStatus,
    /// Site-wide role names.
    pub rbac_roles: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Objecter for User {
    fn object(&self) -> Object {
        resources::USER.with_id(self.id).with_owner(self.id)
    }
}

#[derive(Debug, Clone)]
pub struct InsertUserParams {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub rbac_roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationMember {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    /// Organization-scoped role names, without the `:<org>` suffix.
    pub roles: Vec<String>,
}

impl Objecter for OrganizationMember {
    fn object(&self) -> Object {
        resources::ORGANIZATION
            .with_id(self.organization_id)
            .in_org(self.organization_id)
    }
}

#[derive(Debug, Clone)]
pub struct InsertOrganizationMemberParams {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub roles: Vec<String>,
}

/// Everything needed to build a policy subject for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationUserRoles {
    pub id: Uuid,
    pub username: String,
    pub status: UserStatus,
    /// Site roles plus `organization-member:<org>` and any org roles
    /// expanded to `<role>:<org>`.
    pub roles: Vec<String>,
    pub groups: Vec<Uuid>,
}

// ── API keys ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginType {
    Password,
    Github,
    Oidc,
    Token,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub login_type: LoginType,
    #[serde(with = "time::serde::rfc3339")]
    pub last_used: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Objecter for ApiKey {
    fn object(&self) -> Object {
        resources::API_KEY.with_id(self.id).with_owner(self.user_id)
    }
}

#[derive(Debug, Clone)]
pub struct InsertApiKeyParams {
    pub user_id: Uuid,
    pub login_type: LoginType,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdateApiKeyByIdParams {
    pub id: Uuid,
    pub last_used: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

// ── Groups ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub organization_id: Uuid,
    pub quota_allowance: i32,
}

impl Objecter for Group {
    fn object(&self) -> Object {
        resources::GROUP.with_id(self.id).in_org(self.organization_id)
    }
}

#[derive(Debug, Clone)]
pub struct InsertGroupParams {
    pub name: String,
    pub organization_id: Uuid,
    pub quota_allowance: i32,
}

#[derive(Debug, Clone)]
pub struct UpdateGroupByIdParams {
    pub id: Uuid,
    pub name: String,
    pub quota_allowance: i32,
}

#[derive(Debug, Clone)]
pub struct GetGroupByOrgAndNameParams {
    pub organization_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct InsertGroupMemberParams {
    pub group_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteGroupMemberFromGroupParams {
    pub group_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct InsertUserGroupsByNameParams {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub group_names: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteGroupMembersByOrgAndUserParams {
    pub organization_id: Uuid,
    pub user_id: Uuid,
}

// ── Templates ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Objecter for Template {
    fn object(&self) -> Object {
        resources::TEMPLATE
            .with_id(self.id)
            .in_org(self.organization_id)
    }
}

#[derive(Debug, Clone)]
pub struct InsertTemplateParams {
    pub organization_id: Uuid,
    pub name: String,
    pub created_by: Uuid,
}

// ── Workspaces & builds ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub organization_id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Objecter for Workspace {
    fn object(&self) -> Object {
        resources::WORKSPACE
            .with_id(self.id)
            .with_owner(self.owner_id)
            .in_org(self.organization_id)
    }
}

#[derive(Debug, Clone)]
pub struct InsertWorkspaceParams {
    pub owner_id: Uuid,
    pub organization_id: Uuid,
    pub template_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct UpdateWorkspaceParams {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceTransition {
    Start,
    Stop,
    Delete,
}

/// A workspace build.
///
/// Carries the owning workspace's owner and organization, copied from the
/// workspace row when the build is inserted, so it can be authorized
/// without a second lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceBuild {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub workspace_owner_id: Uuid,
    pub organization_id: Uuid,
    pub build_number: i32,
    pub transition: WorkspaceTransition,
    pub initiator_id: Uuid,
    pub job_id: Uuid,
    pub daily_cost: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Objecter for WorkspaceBuild {
    fn object(&self) -> Object {
        resources::WORKSPACE
            .with_id(self.workspace_id)
            .with_owner(self.workspace_owner_id)
            .in_org(self.organization_id)
    }
}

#[derive(Debug, Clone)]
pub struct InsertWorkspaceBuildParams {
    pub workspace_id: Uuid,
    pub transition: WorkspaceTransition,
    pub initiator_id: Uuid,
    pub job_id: Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateWorkspaceBuildCostByIdParams {
    pub id: Uuid,
    pub daily_cost: i32,
}

// ── Provisioner jobs ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionerJobType {
    TemplateVersionImport,
    WorkspaceBuild,
    TemplateVersionDryRun,
}

impl ProvisionerJobType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TemplateVersionImport => "template_version_import",
            Self::WorkspaceBuild => "workspace_build",
            Self::TemplateVersionDryRun => "template_version_dry_run",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionerJob {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub initiator_id: Uuid,
    pub job_type: ProvisionerJobType,
    /// Job payload as submitted; shape depends on `job_type`.
    pub input: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Objecter for ProvisionerJob {
    fn object(&self) -> Object {
        resources::PROVISIONER_JOB
            .with_id(self.id)
            .with_owner(self.initiator_id)
            .in_org(self.organization_id)
    }
}

#[derive(Debug, Clone)]
pub struct InsertProvisionerJobParams {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub initiator_id: Uuid,
    pub job_type: ProvisionerJobType,
    pub input: serde_json::Value,
}

/// Input payload of a `workspace_build` provisioner job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkspaceProvisionJob {
    pub workspace_build_id: Uuid,
}

// ── Resources, agents & apps ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceResource {
    pub id: Uuid,
    pub job_id: Uuid,
    pub transition: WorkspaceTransition,
    pub resource_type: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct InsertWorkspaceResourceParams {
    pub id: Uuid,
    pub job_id: Uuid,
    pub transition: WorkspaceTransition,
    pub resource_type: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceAgent {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub auth_token: AgentToken,
    /// Cloud instance id the agent may exchange for its token.
    pub auth_instance_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct InsertWorkspaceAgentParams {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub name: String,
    pub auth_token: AgentToken,
    pub auth_instance_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceApp {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub slug: String,
    pub url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct InsertWorkspaceAppParams {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub slug: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceResourceMetadatum {
    pub workspace_resource_id: Uuid,
    pub key: String,
    pub value: Option<String>,
    pub sensitive: bool,
    #[serde(skip)]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct ResourceMetadataEntry {
    pub key: String,
    pub value: Option<String>,
    pub sensitive: bool,
}

#[derive(Debug, Clone)]
pub struct InsertWorkspaceResourceMetadataParams {
    pub workspace_resource_id: Uuid,
    pub entries: Vec<ResourceMetadataEntry>,
}

// ── Replicas ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replica {
    pub id: Uuid,
    pub hostname: String,
    pub region_id: i32,
    pub relay_address: String,
    pub database_latency_ms: i32,
    pub version: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub stopped_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct InsertReplicaParams {
    pub id: Uuid,
    pub hostname: String,
    pub region_id: i32,
    pub relay_address: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct UpdateReplicaParams {
    pub id: Uuid,
    pub relay_address: String,
    pub database_latency_ms: i32,
    pub updated_at: OffsetDateTime,
    pub stopped_at: Option<OffsetDateTime>,
}
