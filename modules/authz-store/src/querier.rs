//! [`Store`] implementation for [`AuthzStore`].
//!
//! Each method picks one check template; the shape and object per method
//! are listed next to it where they are not obvious from the name.

use async_trait::async_trait;
use fleet_security::{Action, AgentToken, Objecter, RequestContext, resources};
use fleet_store::models::{
    ApiKey, AuthorizationUserRoles, DeleteGroupMemberFromGroupParams,
    DeleteGroupMembersByOrgAndUserParams, GetGroupByOrgAndNameParams, Group, InsertApiKeyParams,
    InsertGroupMemberParams, InsertGroupParams, InsertOrganizationMemberParams,
    InsertProvisionerJobParams, InsertReplicaParams, InsertTemplateParams,
    InsertUserGroupsByNameParams, InsertUserParams, InsertWorkspaceAgentParams,
    InsertWorkspaceAppParams, InsertWorkspaceBuildParams, InsertWorkspaceParams,
    InsertWorkspaceResourceMetadataParams, InsertWorkspaceResourceParams, LoginType,
    OrganizationMember, ProvisionerJob, Replica, Template, UpdateApiKeyByIdParams,
    UpdateGroupByIdParams, UpdateReplicaParams, UpdateWorkspaceBuildCostByIdParams,
    UpdateWorkspaceParams, User, Workspace, WorkspaceAgent, WorkspaceApp, WorkspaceBuild,
    WorkspaceResource, WorkspaceResourceMetadatum,
};
use fleet_store::{Store, StoreError};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthzStore;
use crate::checks::Owned;
use crate::system::SystemOperation;

#[async_trait]
impl<S: Store> Store for AuthzStore<S> {
    // ── API keys ────────────────────────────────────────────────────

    async fn get_api_key_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<ApiKey, StoreError> {
        self.fetch(ctx, self.inner.get_api_key_by_id(ctx, id)).await
    }

    async fn get_api_keys_by_login_type(
        &self,
        ctx: &RequestContext,
        login_type: LoginType,
    ) -> Result<Vec<ApiKey>, StoreError> {
        self.fetch_with_post_filter(
            ctx,
            resources::API_KEY,
            self.inner.get_api_keys_by_login_type(ctx, login_type),
        )
        .await
    }

    async fn get_api_keys_last_used_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<ApiKey>, StoreError> {
        self.fetch_with_post_filter(
            ctx,
            resources::API_KEY,
            self.inner.get_api_keys_last_used_after(ctx, after),
        )
        .await
    }

    async fn insert_api_key(
        &self,
        ctx: &RequestContext,
        params: InsertApiKeyParams,
    ) -> Result<ApiKey, StoreError> {
        let object = resources::API_KEY.with_owner(params.user_id);
        self.insert_with_return(ctx, object, move || {
            self.inner.insert_api_key(ctx, params)
        })
        .await
    }

    async fn update_api_key_by_id(
        &self,
        ctx: &RequestContext,
        params: UpdateApiKeyByIdParams,
    ) -> Result<(), StoreError> {
        self.update(
            ctx,
            Action::Update,
            self.inner.get_api_key_by_id(ctx, params.id),
            move || self.inner.update_api_key_by_id(ctx, params),
        )
        .await
    }

    async fn delete_api_key_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        self.delete_q(ctx, self.inner.get_api_key_by_id(ctx, id), || {
            self.inner.delete_api_key_by_id(ctx, id)
        })
        .await
    }

    // ── Groups ──────────────────────────────────────────────────────

    async fn get_group_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<Group, StoreError> {
        self.fetch(ctx, self.inner.get_group_by_id(ctx, id)).await
    }

    async fn get_group_by_org_and_name(
        &self,
        ctx: &RequestContext,
        params: GetGroupByOrgAndNameParams,
    ) -> Result<Group, StoreError> {
        self.fetch(ctx, self.inner.get_group_by_org_and_name(ctx, params))
            .await
    }

    /// Reading members requires reading the group.
    async fn get_group_members(
        &self,
        ctx: &RequestContext,
        group_id: Uuid,
    ) -> Result<Vec<User>, StoreError> {
        self.fetch(ctx, self.inner.get_group_by_id(ctx, group_id))
            .await?;
        self.inner.get_group_members(ctx, group_id).await
    }

    async fn insert_group(
        &self,
        ctx: &RequestContext,
        params: InsertGroupParams,
    ) -> Result<Group, StoreError> {
        let object = resources::GROUP.in_org(params.organization_id);
        self.insert_with_return(ctx, object, move || self.inner.insert_group(ctx, params))
            .await
    }

    async fn insert_all_users_group(
        &self,
        ctx: &RequestContext,
        organization_id: Uuid,
    ) -> Result<Group, StoreError> {
        self.insert_with_return(ctx, resources::GROUP.in_org(organization_id), || {
            self.inner.insert_all_users_group(ctx, organization_id)
        })
        .await
    }

    /// Adding a member is an update of the group.
    async fn insert_group_member(
        &self,
        ctx: &RequestContext,
        params: InsertGroupMemberParams,
    ) -> Result<(), StoreError> {
        self.update(
            ctx,
            Action::Update,
            self.inner.get_group_by_id(ctx, params.group_id),
            || self.inner.insert_group_member(ctx, params),
        )
        .await
    }

    async fn update_group_by_id(
        &self,
        ctx: &RequestContext,
        params: UpdateGroupByIdParams,
    ) -> Result<Group, StoreError> {
        self.update(
            ctx,
            Action::Update,
            self.inner.get_group_by_id(ctx, params.id),
            move || self.inner.update_group_by_id(ctx, params),
        )
        .await
    }

    async fn delete_group_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        self.delete_q(ctx, self.inner.get_group_by_id(ctx, id), || {
            self.inner.delete_group_by_id(ctx, id)
        })
        .await
    }

    /// Removing a member is an update of the group, not a delete.
    async fn delete_group_member_from_group(
        &self,
        ctx: &RequestContext,
        params: DeleteGroupMemberFromGroupParams,
    ) -> Result<(), StoreError> {
        self.update(
            ctx,
            Action::Update,
            self.inner.get_group_by_id(ctx, params.group_id),
            || self.inner.delete_group_member_from_group(ctx, params),
        )
        .await
    }

    /// Checked once against "some group in this organization" rather than
    /// per named group. Permission to update any group of the organization
    /// implies permission to update these.
    async fn insert_user_groups_by_name(
        &self,
        ctx: &RequestContext,
        params: InsertUserGroupsByNameParams,
    ) -> Result<(), StoreError> {
        let object = resources::GROUP.in_org(params.organization_id);
        self.representative(ctx, Action::Update, object, move || {
            self.inner.insert_user_groups_by_name(ctx, params)
        })
        .await
    }

    /// Same representative check as [`Store::insert_user_groups_by_name`].
    async fn delete_group_members_by_org_and_user(
        &self,
        ctx: &RequestContext,
        params: DeleteGroupMembersByOrgAndUserParams,
    ) -> Result<(), StoreError> {
        let object = resources::GROUP.in_org(params.organization_id);
        self.representative(ctx, Action::Update, object, || {
            self.inner.delete_group_members_by_org_and_user(ctx, params)
        })
        .await
    }

    // ── Users & organizations ───────────────────────────────────────

    async fn get_user_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<User, StoreError> {
        self.fetch(ctx, self.inner.get_user_by_id(ctx, id)).await
    }

    async fn get_users(&self, ctx: &RequestContext) -> Result<Vec<User>, StoreError> {
        self.fetch_with_post_filter(ctx, resources::USER, self.inner.get_users(ctx))
            .await
    }

    async fn insert_user(
        &self,
        ctx: &RequestContext,
        params: InsertUserParams,
    ) -> Result<User, StoreError> {
        self.insert_with_return(ctx, resources::USER.object(), move || {
            self.inner.insert_user(ctx, params)
        })
        .await
    }

    async fn insert_organization_member(
        &self,
        ctx: &RequestContext,
        params: InsertOrganizationMemberParams,
    ) -> Result<OrganizationMember, StoreError> {
        let org = params.organization_id;
        let object = resources::ORGANIZATION.with_id(org).in_org(org);
        self.insert_with_return(ctx, object, move || {
            self.inner.insert_organization_member(ctx, params)
        })
        .await
    }

    async fn get_authorization_user_roles(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
    ) -> Result<AuthorizationUserRoles, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetAuthorizationUserRoles,
            self.inner.get_authorization_user_roles(ctx, user_id),
        )
        .await
    }

    async fn get_active_user_count(&self, ctx: &RequestContext) -> Result<i64, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetActiveUserCount,
            self.inner.get_active_user_count(ctx),
        )
        .await
    }

    // ── Templates ───────────────────────────────────────────────────

    async fn get_template_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Template, StoreError> {
        self.fetch(ctx, self.inner.get_template_by_id(ctx, id)).await
    }

    async fn get_templates(&self, ctx: &RequestContext) -> Result<Vec<Template>, StoreError> {
        self.fetch_with_post_filter(ctx, resources::TEMPLATE, self.inner.get_templates(ctx))
            .await
    }

    async fn insert_template(
        &self,
        ctx: &RequestContext,
        params: InsertTemplateParams,
    ) -> Result<Template, StoreError> {
        let object = resources::TEMPLATE.in_org(params.organization_id);
        self.insert_with_return(ctx, object, move || {
            self.inner.insert_template(ctx, params)
        })
        .await
    }

    // ── Workspaces ──────────────────────────────────────────────────

    async fn get_workspace_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Workspace, StoreError> {
        self.fetch(ctx, self.inner.get_workspace_by_id(ctx, id)).await
    }

    async fn get_workspace_by_agent_id(
        &self,
        ctx: &RequestContext,
        agent_id: Uuid,
    ) -> Result<Workspace, StoreError> {
        self.fetch(ctx, self.inner.get_workspace_by_agent_id(ctx, agent_id))
            .await
    }

    async fn get_workspaces(&self, ctx: &RequestContext) -> Result<Vec<Workspace>, StoreError> {
        self.fetch_with_post_filter(ctx, resources::WORKSPACE, self.inner.get_workspaces(ctx))
            .await
    }

    async fn insert_workspace(
        &self,
        ctx: &RequestContext,
        params: InsertWorkspaceParams,
    ) -> Result<Workspace, StoreError> {
        let object = resources::WORKSPACE
            .in_org(params.organization_id)
            .with_owner(params.owner_id);
        self.insert_with_return(ctx, object, move || {
            self.inner.insert_workspace(ctx, params)
        })
        .await
    }

    async fn update_workspace_by_id(
        &self,
        ctx: &RequestContext,
        params: UpdateWorkspaceParams,
    ) -> Result<Workspace, StoreError> {
        self.update(
            ctx,
            Action::Update,
            self.inner.get_workspace_by_id(ctx, params.id),
            move || self.inner.update_workspace_by_id(ctx, params),
        )
        .await
    }

    async fn delete_workspace_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<(), StoreError> {
        self.delete_q(ctx, self.inner.get_workspace_by_id(ctx, id), || {
            self.inner.delete_workspace_by_id(ctx, id)
        })
        .await
    }

    // ── Workspace builds ────────────────────────────────────────────

    async fn get_workspace_build_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<WorkspaceBuild, StoreError> {
        self.fetch(ctx, self.inner.get_workspace_build_by_id(ctx, id))
            .await
    }

    async fn get_latest_workspace_build_by_workspace_id(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
    ) -> Result<WorkspaceBuild, StoreError> {
        self.fetch(
            ctx,
            self.inner
                .get_latest_workspace_build_by_workspace_id(ctx, workspace_id),
        )
        .await
    }

    /// Starting a build is an update of the workspace it belongs to.
    async fn insert_workspace_build(
        &self,
        ctx: &RequestContext,
        params: InsertWorkspaceBuildParams,
    ) -> Result<WorkspaceBuild, StoreError> {
        self.update(
            ctx,
            Action::Update,
            self.inner.get_workspace_by_id(ctx, params.workspace_id),
            move || self.inner.insert_workspace_build(ctx, params),
        )
        .await
    }

    async fn update_workspace_build_cost_by_id(
        &self,
        ctx: &RequestContext,
        params: UpdateWorkspaceBuildCostByIdParams,
    ) -> Result<WorkspaceBuild, StoreError> {
        self.system(
            ctx,
            SystemOperation::UpdateWorkspaceBuildCostById,
            self.inner.update_workspace_build_cost_by_id(ctx, params),
        )
        .await
    }

    async fn get_latest_workspace_builds(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<WorkspaceBuild>, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetLatestWorkspaceBuilds,
            self.inner.get_latest_workspace_builds(ctx),
        )
        .await
    }

    async fn get_workspace_builds_created_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceBuild>, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetWorkspaceBuildsCreatedAfter,
            self.inner.get_workspace_builds_created_after(ctx, after),
        )
        .await
    }

    // ── Provisioner jobs ────────────────────────────────────────────

    async fn get_provisioner_job_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<ProvisionerJob, StoreError> {
        self.fetch(ctx, self.inner.get_provisioner_job_by_id(ctx, id))
            .await
    }

    async fn insert_provisioner_job(
        &self,
        ctx: &RequestContext,
        params: InsertProvisionerJobParams,
    ) -> Result<ProvisionerJob, StoreError> {
        let object = resources::PROVISIONER_JOB
            .in_org(params.organization_id)
            .with_owner(params.initiator_id);
        self.insert_with_return(ctx, object, move || {
            self.inner.insert_provisioner_job(ctx, params)
        })
        .await
    }

    // ── Resources, agents & apps ────────────────────────────────────

    async fn get_workspace_resource_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<WorkspaceResource, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetWorkspaceResourceById,
            self.inner.get_workspace_resource_by_id(ctx, id),
        )
        .await
    }

    async fn get_workspace_resources_created_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceResource>, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetWorkspaceResourcesCreatedAfter,
            self.inner.get_workspace_resources_created_after(ctx, after),
        )
        .await
    }

    async fn insert_workspace_resource(
        &self,
        ctx: &RequestContext,
        params: InsertWorkspaceResourceParams,
    ) -> Result<WorkspaceResource, StoreError> {
        self.system(
            ctx,
            SystemOperation::InsertWorkspaceResource,
            self.inner.insert_workspace_resource(ctx, params),
        )
        .await
    }

    async fn get_workspace_resource_metadata_created_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceResourceMetadatum>, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetWorkspaceResourceMetadataCreatedAfter,
            self.inner
                .get_workspace_resource_metadata_created_after(ctx, after),
        )
        .await
    }

    async fn insert_workspace_resource_metadata(
        &self,
        ctx: &RequestContext,
        params: InsertWorkspaceResourceMetadataParams,
    ) -> Result<Vec<WorkspaceResourceMetadatum>, StoreError> {
        self.system(
            ctx,
            SystemOperation::InsertWorkspaceResourceMetadata,
            self.inner.insert_workspace_resource_metadata(ctx, params),
        )
        .await
    }

    /// Agents have no ownership of their own; they are read through the
    /// workspace they run in.
    async fn get_workspace_agent_by_id(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<WorkspaceAgent, StoreError> {
        let owned = self
            .fetch(ctx, async {
                let agent = self.inner.get_workspace_agent_by_id(ctx, id).await?;
                let workspace = self.inner.get_workspace_by_agent_id(ctx, id).await?;
                Ok::<_, StoreError>(Owned::new(agent, workspace.object()))
            })
            .await?;
        Ok(owned.value)
    }

    async fn get_workspace_agent_by_auth_token(
        &self,
        ctx: &RequestContext,
        token: AgentToken,
    ) -> Result<WorkspaceAgent, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetWorkspaceAgentByAuthToken,
            self.inner.get_workspace_agent_by_auth_token(ctx, token),
        )
        .await
    }

    async fn get_workspace_agent_by_instance_id(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
    ) -> Result<WorkspaceAgent, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetWorkspaceAgentByInstanceId,
            self.inner.get_workspace_agent_by_instance_id(ctx, instance_id),
        )
        .await
    }

    async fn get_workspace_agents_created_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceAgent>, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetWorkspaceAgentsCreatedAfter,
            self.inner.get_workspace_agents_created_after(ctx, after),
        )
        .await
    }

    async fn insert_workspace_agent(
        &self,
        ctx: &RequestContext,
        params: InsertWorkspaceAgentParams,
    ) -> Result<WorkspaceAgent, StoreError> {
        self.system(
            ctx,
            SystemOperation::InsertWorkspaceAgent,
            self.inner.insert_workspace_agent(ctx, params),
        )
        .await
    }

    async fn get_workspace_apps_created_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceApp>, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetWorkspaceAppsCreatedAfter,
            self.inner.get_workspace_apps_created_after(ctx, after),
        )
        .await
    }

    async fn insert_workspace_app(
        &self,
        ctx: &RequestContext,
        params: InsertWorkspaceAppParams,
    ) -> Result<WorkspaceApp, StoreError> {
        self.system(
            ctx,
            SystemOperation::InsertWorkspaceApp,
            self.inner.insert_workspace_app(ctx, params),
        )
        .await
    }

    // ── Deployment & replicas ───────────────────────────────────────

    async fn get_derp_mesh_key(&self, ctx: &RequestContext) -> Result<String, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetDerpMeshKey,
            self.inner.get_derp_mesh_key(ctx),
        )
        .await
    }

    async fn insert_derp_mesh_key(
        &self,
        ctx: &RequestContext,
        value: String,
    ) -> Result<(), StoreError> {
        self.system(
            ctx,
            SystemOperation::InsertDerpMeshKey,
            self.inner.insert_derp_mesh_key(ctx, value),
        )
        .await
    }

    async fn insert_deployment_id(
        &self,
        ctx: &RequestContext,
        value: String,
    ) -> Result<(), StoreError> {
        self.system(
            ctx,
            SystemOperation::InsertDeploymentId,
            self.inner.insert_deployment_id(ctx, value),
        )
        .await
    }

    async fn insert_replica(
        &self,
        ctx: &RequestContext,
        params: InsertReplicaParams,
    ) -> Result<Replica, StoreError> {
        self.system(
            ctx,
            SystemOperation::InsertReplica,
            self.inner.insert_replica(ctx, params),
        )
        .await
    }

    async fn update_replica(
        &self,
        ctx: &RequestContext,
        params: UpdateReplicaParams,
    ) -> Result<Replica, StoreError> {
        self.system(
            ctx,
            SystemOperation::UpdateReplica,
            self.inner.update_replica(ctx, params),
        )
        .await
    }

    async fn delete_replicas_updated_before(
        &self,
        ctx: &RequestContext,
        before: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.system(
            ctx,
            SystemOperation::DeleteReplicasUpdatedBefore,
            self.inner.delete_replicas_updated_before(ctx, before),
        )
        .await
    }

    async fn get_replicas_updated_after(
        &self,
        ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<Replica>, StoreError> {
        self.system(
            ctx,
            SystemOperation::GetReplicasUpdatedAfter,
            self.inner.get_replicas_updated_after(ctx, after),
        )
        .await
    }
}
