use async_trait::async_trait;
use fleet_security::{AgentToken, RequestContext};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    ApiKey, AuthorizationUserRoles, DeleteGroupMemberFromGroupParams,
    DeleteGroupMembersByOrgAndUserParams, GetGroupByOrgAndNameParams, Group,
    InsertApiKeyParams, InsertGroupMemberParams, InsertGroupParams,
    InsertOrganizationMemberParams, InsertProvisionerJobParams, InsertReplicaParams,
    InsertTemplateParams, InsertUserGroupsByNameParams, InsertUserParams,
    InsertWorkspaceAgentParams, InsertWorkspaceAppParams, InsertWorkspaceBuildParams,
    InsertWorkspaceParams, InsertWorkspaceResourceMetadataParams, InsertWorkspaceResourceParams,
    LoginType, OrganizationMember, ProvisionerJob, Replica, Template, UpdateApiKeyByIdParams,
    UpdateGroupByIdParams, UpdateReplicaParams, UpdateWorkspaceBuildCostByIdParams,
    UpdateWorkspaceParams, User, Workspace, WorkspaceAgent, WorkspaceApp, WorkspaceBuild,
    WorkspaceResource, WorkspaceResourceMetadatum,
};

/// Persistence contract: one method per domain operation.
///
/// Every method receives the request's [`RequestContext`] so that wrapping
/// implementations (authorization, tracing) see who is acting and can honor
/// cancellation. Absent rows are reported as [`StoreError::NotFound`].
#[async_trait]
pub trait Store: Send + Sync {
    // ── API keys ────────────────────────────────────────────────────

    async fn get_api_key_by_id(&self, ctx: &RequestContext, id: Uuid)
    -> Result<ApiKey, StoreError>;

    async fn get_api_keys_by_login_type(
        &self,
        ctx: &RequestContext,
        login_type: LoginType,
    ) -> Result<Vec<ApiKey>, StoreError>;

    async fn get_api_keys_last_used_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<ApiKey>, StoreError>;

    async fn insert_api_key(
        &self,
        ctx: &RequestContext,
        params: InsertApiKeyParams,
    ) -> Result<ApiKey, StoreError>;

    async fn update_api_key_by_id(
        &self,
        ctx: &RequestContext,
        params: UpdateApiKeyByIdParams,
    ) -> Result<(), StoreError>;

    async fn delete_api_key_by_id(&self, ctx: &RequestContext, id: Uuid)
    -> Result<(), StoreError>;

    // ── Groups ──────────────────────────────────────────────────────

    async fn get_group_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<Group, StoreError>;

    async fn get_group_by_org_and_name(
        &self,
        ctx: &RequestContext,
        params: GetGroupByOrgAndNameParams,
    ) -> Result<Group, StoreError>;

    async fn get_group_members(
        &self,
        ctx: &RequestContext,
        group_id: Uuid,
    ) -> Result<Vec<User>, StoreError>;

    async fn insert_group(
        &self,
        ctx: &RequestContext,
        params: InsertGroupParams,
    ) -> Result<Group, StoreError>;

    /// Create the organization's "Everyone" group, whose id equals the org id.
    async fn insert_all_users_group(
        &self,
        ctx: &RequestContext,
        organization_id: Uuid,
    ) -> Result<Group, StoreError>;

    async fn insert_group_member(
        &self,
        ctx: &RequestContext,
        params: InsertGroupMemberParams,
    ) -> Result<(), StoreError>;

    async fn update_group_by_id(
        &self,
        ctx: &RequestContext,
        params: UpdateGroupByIdParams,
    ) -> Result<Group, StoreError>;

    async fn delete_group_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError>;

    async fn delete_group_member_from_group(
        &self,
        ctx: &RequestContext,
        params: DeleteGroupMemberFromGroupParams,
    ) -> Result<(), StoreError>;

    /// Add a user to every named group of an organization.
    async fn insert_user_groups_by_name(
        &self,
        ctx: &RequestContext,
        params: InsertUserGroupsByNameParams,
    ) -> Result<(), StoreError>;

    /// Remove a user from every group of an organization.
    async fn delete_group_members_by_org_and_user(
        &self,
        ctx: &RequestContext,
        params: DeleteGroupMembersByOrgAndUserParams,
    ) -> Result<(), StoreError>;

    // ── Users & organizations ───────────────────────────────────────

    async fn get_user_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<User, StoreError>;

    async fn get_users(&self, ctx: &RequestContext) -> Result<Vec<User>, StoreError>;

    async fn insert_user(
        &self,
        ctx: &RequestContext,
        params: InsertUserParams,
    ) -> Result<User, StoreError>;

    async fn insert_organization_member(
        &self,
        ctx: &RequestContext,
        params: InsertOrganizationMemberParams,
    ) -> Result<OrganizationMember, StoreError>;

    async fn get_authorization_user_roles(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
    ) -> Result<AuthorizationUserRoles, StoreError>;

    async fn get_active_user_count(&self, ctx: &RequestContext) -> Result<i64, StoreError>;

    // ── Templates ───────────────────────────────────────────────────

    async fn get_template_by_id(&self, ctx: &RequestContext, id: Uuid)
    -> Result<Template, StoreError>;

    async fn get_templates(&self, ctx: &RequestContext) -> Result<Vec<Template>, StoreError>;

    async fn insert_template(
        &self,
        ctx: &RequestContext,
        params: InsertTemplateParams,
    ) -> Result<Template, StoreError>;

    // ── Workspaces ──────────────────────────────────────────────────

    async fn get_workspace_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Workspace, StoreError>;

    async fn get_workspace_by_agent_id(
        &self,
        ctx: &RequestContext,
        agent_id: Uuid,
    ) -> Result<Workspace, StoreError>;

    async fn get_workspaces(&self, ctx: &RequestContext) -> Result<Vec<Workspace>, StoreError>;

    async fn insert_workspace(
        &self,
        ctx: &RequestContext,
        params: InsertWorkspaceParams,
    ) -> Result<Workspace, StoreError>;

    async fn update_workspace_by_id(
        &self,
        ctx: &RequestContext,
        params: UpdateWorkspaceParams,
    ) -> Result<Workspace, StoreError>;

    async fn delete_workspace_by_id(&self, ctx: &RequestContext, id: Uuid)
    -> Result<(), StoreError>;

    // ── Workspace builds ────────────────────────────────────────────

    async fn get_workspace_build_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<WorkspaceBuild, StoreError>;

    async fn get_latest_workspace_build_by_workspace_id(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
    ) -> Result<WorkspaceBuild, StoreError>;

    async fn insert_workspace_build(
        &self,
        ctx: &RequestContext,
        params: InsertWorkspaceBuildParams,
    ) -> Result<WorkspaceBuild, StoreError>;

    async fn update_workspace_build_cost_by_id(
        &self,
        ctx: &RequestContext,
        params: UpdateWorkspaceBuildCostByIdParams,
    ) -> Result<WorkspaceBuild, StoreError>;

    /// Latest build of every workspace.
    async fn get_latest_workspace_builds(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<WorkspaceBuild>, StoreError>;

    async fn get_workspace_builds_created_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceBuild>, StoreError>;

    // ── Provisioner jobs ────────────────────────────────────────────

    async fn get_provisioner_job_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<ProvisionerJob, StoreError>;

    async fn insert_provisioner_job(
        &self,
        ctx: &RequestContext,
        params: InsertProvisionerJobParams,
    ) -> Result<ProvisionerJob, StoreError>;

    // ── Resources, agents & apps ────────────────────────────────────

    async fn get_workspace_resource_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<WorkspaceResource, StoreError>;

    async fn get_workspace_resources_created_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceResource>, StoreError>;

    async fn insert_workspace_resource(
        &self,
        ctx: &RequestContext,
        params: InsertWorkspaceResourceParams,
    ) -> Result<WorkspaceResource, StoreError>;

    async fn get_workspace_resource_metadata_created_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceResourceMetadatum>, StoreError>;

    async fn insert_workspace_resource_metadata(
        &self,
        ctx: &RequestContext,
        params: InsertWorkspaceResourceMetadataParams,
    ) -> Result<Vec<WorkspaceResourceMetadatum>, StoreError>;

    async fn get_workspace_agent_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<WorkspaceAgent, StoreError>;

    async fn get_workspace_agent_by_auth_token(
        &self,
        ctx: &RequestContext,
        token: AgentToken,
    ) -> Result<WorkspaceAgent, StoreError>;

    async fn get_workspace_agent_by_instance_id(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
    ) -> Result<WorkspaceAgent, StoreError>;

    async fn get_workspace_agents_created_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceAgent>, StoreError>;

    async fn insert_workspace_agent(
        &self,
        ctx: &RequestContext,
        params: InsertWorkspaceAgentParams,
    ) -> Result<WorkspaceAgent, StoreError>;

    async fn get_workspace_apps_created_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceApp>, StoreError>;

    async fn insert_workspace_app(
        &self,
        ctx: &RequestContext,
        params: InsertWorkspaceAppParams,
    ) -> Result<WorkspaceApp, StoreError>;

    // ── Deployment & replicas ───────────────────────────────────────

    async fn get_derp_mesh_key(&self, ctx: &RequestContext) -> Result<String, StoreError>;

    async fn insert_derp_mesh_key(&self, ctx: &RequestContext, value: String)
    -> Result<(), StoreError>;

    async fn insert_deployment_id(&self, ctx: &RequestContext, value: String)
    -> Result<(), StoreError>;

    async fn insert_replica(
        &self,
        ctx: &RequestContext,
        params: InsertReplicaParams,
    ) -> Result<Replica, StoreError>;

    async fn update_replica(
        &self,
        ctx: &RequestContext,
        params: UpdateReplicaParams,
    ) -> Result<Replica, StoreError>;

    async fn delete_replicas_updated_before(
        &self,
        ctx: &RequestContext,
        before: OffsetDateTime,
    ) -> Result<(), StoreError>;

    async fn get_replicas_updated_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<Replica>, StoreError>;
}
