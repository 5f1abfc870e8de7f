//! In-memory [`Store`] used by the development server and tests.
//!
//! Rows are kept in insertion order so list operations are stable.
//! The store does not look at the caller's actor or cancellation token;
//! both are the authorization layer's concern.

use async_trait::async_trait;
use fleet_security::{AgentToken, RequestContext};
use parking_lot::RwLock;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    ApiKey, AuthorizationUserRoles, DeleteGroupMemberFromGroupParams,
    DeleteGroupMembersByOrgAndUserParams, GetGroupByOrgAndNameParams, Group, GroupMember,
    InsertApiKeyParams, InsertGroupMemberParams, InsertGroupParams,
    InsertOrganizationMemberParams, InsertProvisionerJobParams, InsertReplicaParams,
    InsertTemplateParams, InsertUserGroupsByNameParams, InsertUserParams,
    InsertWorkspaceAgentParams, InsertWorkspaceAppParams, InsertWorkspaceBuildParams,
    InsertWorkspaceParams, InsertWorkspaceResourceMetadataParams, InsertWorkspaceResourceParams,
    LoginType, OrganizationMember, ProvisionerJob, ProvisionerJobType, Replica, Template,
    UpdateApiKeyByIdParams, UpdateGroupByIdParams, UpdateReplicaParams,
    UpdateWorkspaceBuildCostByIdParams, UpdateWorkspaceParams, User, UserStatus, Workspace,
    WorkspaceAgent, WorkspaceApp, WorkspaceBuild, WorkspaceProvisionJob, WorkspaceResource,
    WorkspaceResourceMetadatum,
};
use crate::store::Store;

/// Name given to the group created by `insert_all_users_group`.
pub const ALL_USERS_GROUP_NAME: &str = "Everyone";

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    org_members: Vec<OrganizationMember>,
    api_keys: Vec<ApiKey>,
    groups: Vec<Group>,
    group_members: Vec<GroupMember>,
    templates: Vec<Template>,
    workspaces: Vec<Workspace>,
    builds: Vec<WorkspaceBuild>,
    jobs: Vec<ProvisionerJob>,
    resources: Vec<WorkspaceResource>,
    resource_metadata: Vec<WorkspaceResourceMetadatum>,
    agents: Vec<WorkspaceAgent>,
    apps: Vec<WorkspaceApp>,
    replicas: Vec<Replica>,
    derp_mesh_key: Option<String>,
    deployment_id: Option<String>,
}

impl Tables {
    fn group_member_ids(&self, group: &Group) -> Vec<Uuid> {
        // The all-users group's id equals its organization id.
        if group.id == group.organization_id {
            return self
                .org_members
                .iter()
                .filter(|m| m.organization_id == group.organization_id)
                .map(|m| m.user_id)
                .collect();
        }
        self.group_members
            .iter()
            .filter(|m| m.group_id == group.id)
            .map(|m| m.user_id)
            .collect()
    }

    fn latest_build(&self, workspace_id: Uuid) -> Option<&WorkspaceBuild> {
        self.builds
            .iter()
            .filter(|b| b.workspace_id == workspace_id)
            .max_by_key(|b| b.build_number)
    }
}

fn find<T: Clone>(rows: &[T], pred: impl Fn(&T) -> bool) -> Result<T, StoreError> {
    rows.iter().find(|r| pred(r)).cloned().ok_or(StoreError::NotFound)
}

fn find_mut<T>(rows: &mut [T], pred: impl Fn(&T) -> bool) -> Result<&mut T, StoreError> {
    rows.iter_mut().find(|r| pred(r)).ok_or(StoreError::NotFound)
}

fn filter<T: Clone>(rows: &[T], pred: impl Fn(&T) -> bool) -> Vec<T> {
    rows.iter().filter(|r| pred(r)).cloned().collect()
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemStore {
    tables: RwLock<Tables>,
}

impl MemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemStore {
    // ── API keys ────────────────────────────────────────────────────

    async fn get_api_key_by_id(
        &self,
        _ctx: &RequestContext,
        id: Uuid,
    ) -> Result<ApiKey, StoreError> {
        find(&self.tables.read().api_keys, |k| k.id == id)
    }

    async fn get_api_keys_by_login_type(
        &self,
        _ctx: &RequestContext,
        login_type: LoginType,
    ) -> Result<Vec<ApiKey>, StoreError> {
        Ok(filter(&self.tables.read().api_keys, |k| {
            k.login_type == login_type
        }))
    }

    async fn get_api_keys_last_used_after(
        &self,
        _ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<ApiKey>, StoreError> {
        Ok(filter(&self.tables.read().api_keys, |k| k.last_used > after))
    }

    async fn insert_api_key(
        &self,
        _ctx: &RequestContext,
        params: InsertApiKeyParams,
    ) -> Result<ApiKey, StoreError> {
        let now = OffsetDateTime::now_utc();
        let key = ApiKey {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            login_type: params.login_type,
            last_used: now,
            expires_at: params.expires_at,
            created_at: now,
        };
        self.tables.write().api_keys.push(key.clone());
        Ok(key)
    }

    async fn update_api_key_by_id(
        &self,
        _ctx: &RequestContext,
        params: UpdateApiKeyByIdParams,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let key = find_mut(&mut tables.api_keys, |k| k.id == params.id)?;
        key.last_used = params.last_used;
        key.expires_at = params.expires_at;
        Ok(())
    }

    async fn delete_api_key_by_id(&self, _ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        self.tables.write().api_keys.retain(|k| k.id != id);
        Ok(())
    }

    // ── Groups ──────────────────────────────────────────────────────

    async fn get_group_by_id(&self, _ctx: &RequestContext, id: Uuid) -> Result<Group, StoreError> {
        find(&self.tables.read().groups, |g| g.id == id)
    }

    async fn get_group_by_org_and_name(
        &self,
        _ctx: &RequestContext,
        params: GetGroupByOrgAndNameParams,
    ) -> Result<Group, StoreError> {
        find(&self.tables.read().groups, |g| {
            g.organization_id == params.organization_id && g.name == params.name
        })
    }

    async fn get_group_members(
        &self,
        _ctx: &RequestContext,
        group_id: Uuid,
    ) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read();
        let group = find(&tables.groups, |g| g.id == group_id)?;
        let ids = tables.group_member_ids(&group);
        Ok(filter(&tables.users, |u| ids.contains(&u.id)))
    }

    async fn insert_group(
        &self,
        _ctx: &RequestContext,
        params: InsertGroupParams,
    ) -> Result<Group, StoreError> {
        let mut tables = self.tables.write();
        if tables
            .groups
            .iter()
            .any(|g| g.organization_id == params.organization_id && g.name == params.name)
        {
            return Err(StoreError::conflict(format!(
                "group \"{}\" already exists in organization",
                params.name
            )));
        }
        let group = Group {
            id: Uuid::new_v4(),
            name: params.name,
            organization_id: params.organization_id,
            quota_allowance: params.quota_allowance,
        };
        tables.groups.push(group.clone());
        Ok(group)
    }

    async fn insert_all_users_group(
        &self,
        _ctx: &RequestContext,
        organization_id: Uuid,
    ) -> Result<Group, StoreError> {
        let mut tables = self.tables.write();
        if tables.groups.iter().any(|g| g.id == organization_id) {
            return Err(StoreError::conflict("all-users group already exists"));
        }
        let group = Group {
            id: organization_id,
            name: ALL_USERS_GROUP_NAME.to_owned(),
            organization_id,
            quota_allowance: 0,
        };
        tables.groups.push(group.clone());
        Ok(group)
    }

    async fn insert_group_member(
        &self,
        _ctx: &RequestContext,
        params: InsertGroupMemberParams,
    ) -> Result<(), StoreError> {
        let member = GroupMember {
            group_id: params.group_id,
            user_id: params.user_id,
        };
        let mut tables = self.tables.write();
        if tables.group_members.contains(&member) {
            return Err(StoreError::conflict("user is already a group member"));
        }
        tables.group_members.push(member);
        Ok(())
    }

    async fn update_group_by_id(
        &self,
        _ctx: &RequestContext,
        params: UpdateGroupByIdParams,
    ) -> Result<Group, StoreError> {
        let mut tables = self.tables.write();
        let group = find_mut(&mut tables.groups, |g| g.id == params.id)?;
        group.name = params.name;
        group.quota_allowance = params.quota_allowance;
        Ok(group.clone())
    }

    async fn delete_group_by_id(&self, _ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables.groups.retain(|g| g.id != id);
        tables.group_members.retain(|m| m.group_id != id);
        Ok(())
    }

    async fn delete_group_member_from_group(
        &self,
        _ctx: &RequestContext,
        params: DeleteGroupMemberFromGroupParams,
    ) -> Result<(), StoreError> {
        self.tables
            .write()
            .group_members
            .retain(|m| !(m.group_id == params.group_id && m.user_id == params.user_id));
        Ok(())
    }

    async fn insert_user_groups_by_name(
        &self,
        _ctx: &RequestContext,
        params: InsertUserGroupsByNameParams,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let group_ids: Vec<Uuid> = tables
            .groups
            .iter()
            .filter(|g| {
                g.organization_id == params.organization_id && params.group_names.contains(&g.name)
            })
            .map(|g| g.id)
            .collect();
        for group_id in group_ids {
            let member = GroupMember {
                group_id,
                user_id: params.user_id,
            };
            if !tables.group_members.contains(&member) {
                tables.group_members.push(member);
            }
        }
        Ok(())
    }

    async fn delete_group_members_by_org_and_user(
        &self,
        _ctx: &RequestContext,
        params: DeleteGroupMembersByOrgAndUserParams,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let org_groups: Vec<Uuid> = tables
            .groups
            .iter()
            .filter(|g| g.organization_id == params.organization_id)
            .map(|g| g.id)
            .collect();
        tables
            .group_members
            .retain(|m| !(m.user_id == params.user_id && org_groups.contains(&m.group_id)));
        Ok(())
    }

    // ── Users & organizations ───────────────────────────────────────

    async fn get_user_by_id(&self, _ctx: &RequestContext, id: Uuid) -> Result<User, StoreError> {
        find(&self.tables.read().users, |u| u.id == id)
    }

    async fn get_users(&self, _ctx: &RequestContext) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.read().users.clone())
    }

    async fn insert_user(
        &self,
        _ctx: &RequestContext,
        params: InsertUserParams,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.write();
        if tables
            .users
            .iter()
            .any(|u| u.id == params.id || u.email == params.email || u.username == params.username)
        {
            return Err(StoreError::conflict("user already exists"));
        }
        let user = User {
            id: params.id,
            email: params.email,
            username: params.username,
            status: UserStatus::Active,
            rbac_roles: params.rbac_roles,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn insert_organization_member(
        &self,
        _ctx: &RequestContext,
        params: InsertOrganizationMemberParams,
    ) -> Result<OrganizationMember, StoreError> {
        let mut tables = self.tables.write();
        if tables
            .org_members
            .iter()
            .any(|m| m.organization_id == params.organization_id && m.user_id == params.user_id)
        {
            return Err(StoreError::conflict("user is already an organization member"));
        }
        let member = OrganizationMember {
            organization_id: params.organization_id,
            user_id: params.user_id,
            roles: params.roles,
        };
        tables.org_members.push(member.clone());
        Ok(member)
    }

    async fn get_authorization_user_roles(
        &self,
        _ctx: &RequestContext,
        user_id: Uuid,
    ) -> Result<AuthorizationUserRoles, StoreError> {
        let tables = self.tables.read();
        let user = find(&tables.users, |u| u.id == user_id)?;

        let mut roles = user.rbac_roles;
        let mut groups = Vec::new();
        for membership in tables.org_members.iter().filter(|m| m.user_id == user_id) {
            let org = membership.organization_id;
            roles.push(format!("organization-member:{org}"));
            roles.extend(membership.roles.iter().map(|r| format!("{r}:{org}")));
            if tables.groups.iter().any(|g| g.id == org) {
                groups.push(org);
            }
        }
        groups.extend(
            tables
                .group_members
                .iter()
                .filter(|m| m.user_id == user_id)
                .map(|m| m.group_id),
        );

        Ok(AuthorizationUserRoles {
            id: user.id,
            username: user.username,
            status: user.status,
            roles,
            groups,
        })
    }

    async fn get_active_user_count(&self, _ctx: &RequestContext) -> Result<i64, StoreError> {
        let count = self
            .tables
            .read()
            .users
            .iter()
            .filter(|u| u.status == UserStatus::Active)
            .count();
        i64::try_from(count).map_err(|e| StoreError::internal(e.to_string()))
    }

    // ── Templates ───────────────────────────────────────────────────

    async fn get_template_by_id(
        &self,
        _ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Template, StoreError> {
        find(&self.tables.read().templates, |t| t.id == id)
    }

    async fn get_templates(&self, _ctx: &RequestContext) -> Result<Vec<Template>, StoreError> {
        Ok(self.tables.read().templates.clone())
    }

    async fn insert_template(
        &self,
        _ctx: &RequestContext,
        params: InsertTemplateParams,
    ) -> Result<Template, StoreError> {
        let template = Template {
            id: Uuid::new_v4(),
            organization_id: params.organization_id,
            name: params.name,
            created_by: params.created_by,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.write().templates.push(template.clone());
        Ok(template)
    }

    // ── Workspaces ──────────────────────────────────────────────────

    async fn get_workspace_by_id(
        &self,
        _ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Workspace, StoreError> {
        find(&self.tables.read().workspaces, |w| w.id == id)
    }

    async fn get_workspace_by_agent_id(
        &self,
        _ctx: &RequestContext,
        agent_id: Uuid,
    ) -> Result<Workspace, StoreError> {
        let tables = self.tables.read();
        let agent = find(&tables.agents, |a| a.id == agent_id)?;
        let resource = find(&tables.resources, |r| r.id == agent.resource_id)?;
        let job = find(&tables.jobs, |j| j.id == resource.job_id)?;
        if job.job_type != ProvisionerJobType::WorkspaceBuild {
            return Err(StoreError::NotFound);
        }
        let input: WorkspaceProvisionJob = serde_json::from_value(job.input)
            .map_err(|e| StoreError::internal(format!("decode job input: {e}")))?;
        let build = find(&tables.builds, |b| b.id == input.workspace_build_id)?;
        find(&tables.workspaces, |w| w.id == build.workspace_id)
    }

    async fn get_workspaces(&self, _ctx: &RequestContext) -> Result<Vec<Workspace>, StoreError> {
        Ok(self.tables.read().workspaces.clone())
    }

    async fn insert_workspace(
        &self,
        _ctx: &RequestContext,
        params: InsertWorkspaceParams,
    ) -> Result<Workspace, StoreError> {
        let mut tables = self.tables.write();
        if tables
            .workspaces
            .iter()
            .any(|w| w.owner_id == params.owner_id && w.name == params.name)
        {
            return Err(StoreError::conflict(format!(
                "workspace \"{}\" already exists for owner",
                params.name
            )));
        }
        let workspace = Workspace {
            id: Uuid::new_v4(),
            owner_id: params.owner_id,
            organization_id: params.organization_id,
            template_id: params.template_id,
            name: params.name,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.workspaces.push(workspace.clone());
        Ok(workspace)
    }

    async fn update_workspace_by_id(
        &self,
        _ctx: &RequestContext,
        params: UpdateWorkspaceParams,
    ) -> Result<Workspace, StoreError> {
        let mut tables = self.tables.write();
        let workspace = find_mut(&mut tables.workspaces, |w| w.id == params.id)?;
        workspace.name = params.name;
        Ok(workspace.clone())
    }

    async fn delete_workspace_by_id(
        &self,
        _ctx: &RequestContext,
        id: Uuid,
    ) -> Result<(), StoreError> {
        self.tables.write().workspaces.retain(|w| w.id != id);
        Ok(())
    }

    // ── Workspace builds ────────────────────────────────────────────

    async fn get_workspace_build_by_id(
        &self,
        _ctx: &RequestContext,
        id: Uuid,
    ) -> Result<WorkspaceBuild, StoreError> {
        find(&self.tables.read().builds, |b| b.id == id)
    }

    async fn get_latest_workspace_build_by_workspace_id(
        &self,
        _ctx: &RequestContext,
        workspace_id: Uuid,
    ) -> Result<WorkspaceBuild, StoreError> {
        self.tables
            .read()
            .latest_build(workspace_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert_workspace_build(
        &self,
        _ctx: &RequestContext,
        params: InsertWorkspaceBuildParams,
    ) -> Result<WorkspaceBuild, StoreError> {
        let mut tables = self.tables.write();
        let workspace = find(&tables.workspaces, |w| w.id == params.workspace_id)?;
        let build_number = tables
            .latest_build(workspace.id)
            .map_or(1, |b| b.build_number + 1);
        let build = WorkspaceBuild {
            id: Uuid::new_v4(),
            workspace_id: workspace.id,
            workspace_owner_id: workspace.owner_id,
            organization_id: workspace.organization_id,
            build_number,
            transition: params.transition,
            initiator_id: params.initiator_id,
            job_id: params.job_id,
            daily_cost: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.builds.push(build.clone());
        Ok(build)
    }

    async fn update_workspace_build_cost_by_id(
        &self,
        _ctx: &RequestContext,
        params: UpdateWorkspaceBuildCostByIdParams,
    ) -> Result<WorkspaceBuild, StoreError> {
        let mut tables = self.tables.write();
        let build = find_mut(&mut tables.builds, |b| b.id == params.id)?;
        build.daily_cost = params.daily_cost;
        Ok(build.clone())
    }

    async fn get_latest_workspace_builds(
        &self,
        _ctx: &RequestContext,
    ) -> Result<Vec<WorkspaceBuild>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .workspaces
            .iter()
            .filter_map(|w| tables.latest_build(w.id).cloned())
            .collect())
    }

    async fn get_workspace_builds_created_after(
        &self,
        _ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceBuild>, StoreError> {
        Ok(filter(&self.tables.read().builds, |b| b.created_at > after))
    }

    // ── Provisioner jobs ────────────────────────────────────────────

    async fn get_provisioner_job_by_id(
        &self,
        _ctx: &RequestContext,
        id: Uuid,
    ) -> Result<ProvisionerJob, StoreError> {
        find(&self.tables.read().jobs, |j| j.id == id)
    }

    async fn insert_provisioner_job(
        &self,
        _ctx: &RequestContext,
        params: InsertProvisionerJobParams,
    ) -> Result<ProvisionerJob, StoreError> {
        let mut tables = self.tables.write();
        if tables.jobs.iter().any(|j| j.id == params.id) {
            return Err(StoreError::conflict("provisioner job already exists"));
        }
        let job = ProvisionerJob {
            id: params.id,
            organization_id: params.organization_id,
            initiator_id: params.initiator_id,
            job_type: params.job_type,
            input: params.input,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.jobs.push(job.clone());
        Ok(job)
    }

    // ── Resources, agents & apps ────────────────────────────────────

    async fn get_workspace_resource_by_id(
        &self,
        _ctx: &RequestContext,
        id: Uuid,
    ) -> Result<WorkspaceResource, StoreError> {
        find(&self.tables.read().resources, |r| r.id == id)
    }

    async fn get_workspace_resources_created_after(
        &self,
        _ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceResource>, StoreError> {
        Ok(filter(&self.tables.read().resources, |r| {
            r.created_at > after
        }))
    }

    async fn insert_workspace_resource(
        &self,
        _ctx: &RequestContext,
        params: InsertWorkspaceResourceParams,
    ) -> Result<WorkspaceResource, StoreError> {
        let resource = WorkspaceResource {
            id: params.id,
            job_id: params.job_id,
            transition: params.transition,
            resource_type: params.resource_type,
            name: params.name,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.write().resources.push(resource.clone());
        Ok(resource)
    }

    async fn get_workspace_resource_metadata_created_after(
        &self,
        _ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceResourceMetadatum>, StoreError> {
        Ok(filter(&self.tables.read().resource_metadata, |m| {
            m.created_at > after
        }))
    }

    async fn insert_workspace_resource_metadata(
        &self,
        _ctx: &RequestContext,
        params: InsertWorkspaceResourceMetadataParams,
    ) -> Result<Vec<WorkspaceResourceMetadatum>, StoreError> {
        let now = OffsetDateTime::now_utc();
        let rows: Vec<WorkspaceResourceMetadatum> = params
            .entries
            .into_iter()
            .map(|e| WorkspaceResourceMetadatum {
                workspace_resource_id: params.workspace_resource_id,
                key: e.key,
                value: e.value,
                sensitive: e.sensitive,
                created_at: now,
            })
            .collect();
        self.tables
            .write()
            .resource_metadata
            .extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn get_workspace_agent_by_id(
        &self,
        _ctx: &RequestContext,
        id: Uuid,
    ) -> Result<WorkspaceAgent, StoreError> {
        find(&self.tables.read().agents, |a| a.id == id)
    }

    async fn get_workspace_agent_by_auth_token(
        &self,
        _ctx: &RequestContext,
        token: AgentToken,
    ) -> Result<WorkspaceAgent, StoreError> {
        find(&self.tables.read().agents, |a| a.auth_token == token)
    }

    async fn get_workspace_agent_by_instance_id(
        &self,
        _ctx: &RequestContext,
        instance_id: &str,
    ) -> Result<WorkspaceAgent, StoreError> {
        // Most recently created agent wins when an instance id was reused.
        self.tables
            .read()
            .agents
            .iter()
            .rev()
            .find(|a| a.auth_instance_id.as_deref() == Some(instance_id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_workspace_agents_created_after(
        &self,
        _ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceAgent>, StoreError> {
        Ok(filter(&self.tables.read().agents, |a| a.created_at > after))
    }

    async fn insert_workspace_agent(
        &self,
        _ctx: &RequestContext,
        params: InsertWorkspaceAgentParams,
    ) -> Result<WorkspaceAgent, StoreError> {
        let mut tables = self.tables.write();
        if tables
            .agents
            .iter()
            .any(|a| a.id == params.id || a.auth_token == params.auth_token)
        {
            return Err(StoreError::conflict("workspace agent already exists"));
        }
        let agent = WorkspaceAgent {
            id: params.id,
            resource_id: params.resource_id,
            name: params.name,
            auth_token: params.auth_token,
            auth_instance_id: params.auth_instance_id,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.agents.push(agent.clone());
        Ok(agent)
    }

    async fn get_workspace_apps_created_after(
        &self,
        _ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<WorkspaceApp>, StoreError> {
        Ok(filter(&self.tables.read().apps, |a| a.created_at > after))
    }

    async fn insert_workspace_app(
        &self,
        _ctx: &RequestContext,
        params: InsertWorkspaceAppParams,
    ) -> Result<WorkspaceApp, StoreError> {
        let app = WorkspaceApp {
            id: params.id,
            agent_id: params.agent_id,
            slug: params.slug,
            url: params.url,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.write().apps.push(app.clone());
        Ok(app)
    }

    // ── Deployment & replicas ───────────────────────────────────────

    async fn get_derp_mesh_key(&self, _ctx: &RequestContext) -> Result<String, StoreError> {
        self.tables
            .read()
            .derp_mesh_key
            .clone()
            .ok_or(StoreError::NotFound)
    }

    async fn insert_derp_mesh_key(
        &self,
        _ctx: &RequestContext,
        value: String,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if tables.derp_mesh_key.is_some() {
            return Err(StoreError::conflict("mesh key already set"));
        }
        tables.derp_mesh_key = Some(value);
        Ok(())
    }

    async fn insert_deployment_id(
        &self,
        _ctx: &RequestContext,
        value: String,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if tables.deployment_id.is_some() {
            return Err(StoreError::conflict("deployment id already set"));
        }
        tables.deployment_id = Some(value);
        Ok(())
    }

    async fn insert_replica(
        &self,
        _ctx: &RequestContext,
        params: InsertReplicaParams,
    ) -> Result<Replica, StoreError> {
        let now = OffsetDateTime::now_utc();
        let replica = Replica {
            id: params.id,
            hostname: params.hostname,
            region_id: params.region_id,
            relay_address: params.relay_address,
            database_latency_ms: 0,
            version: params.version,
            created_at: now,
            updated_at: now,
            stopped_at: None,
        };
        self.tables.write().replicas.push(replica.clone());
        Ok(replica)
    }

    async fn update_replica(
        &self,
        _ctx: &RequestContext,
        params: UpdateReplicaParams,
    ) -> Result<Replica, StoreError> {
        let mut tables = self.tables.write();
        let replica = find_mut(&mut tables.replicas, |r| r.id == params.id)?;
        replica.relay_address = params.relay_address;
        replica.database_latency_ms = params.database_latency_ms;
        replica.updated_at = params.updated_at;
        replica.stopped_at = params.stopped_at;
        Ok(replica.clone())
    }

    async fn delete_replicas_updated_before(
        &self,
        _ctx: &RequestContext,
        before: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.tables.write().replicas.retain(|r| r.updated_at >= before);
        Ok(())
    }

    async fn get_replicas_updated_after(
        &self,
        _ctx: &RequestContext,
        after: OffsetDateTime,
    ) -> Result<Vec<Replica>, StoreError> {
        Ok(filter(&self.tables.read().replicas, |r| r.updated_at > after))
    }
}
