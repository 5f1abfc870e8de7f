//! Operations exempt from per-row authorization.
//!
//! Each variant is a reviewed trust boundary: the operation is called by an
//! internal collaborator that already runs under a system bypass or behind
//! infrastructure access control. They are still authorized against the
//! `system` resource, so a bypass passes and an ordinary subject needs an
//! explicit grant.

use std::fmt;

use fleet_security::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemOperation {
    GetLatestWorkspaceBuilds,
    GetWorkspaceAgentByAuthToken,
    GetWorkspaceAgentByInstanceId,
    GetWorkspaceResourceById,
    GetActiveUserCount,
    GetAuthorizationUserRoles,
    GetDerpMeshKey,
    InsertDerpMeshKey,
    InsertDeploymentId,
    InsertReplica,
    UpdateReplica,
    DeleteReplicasUpdatedBefore,
    GetReplicasUpdatedAfter,
    UpdateWorkspaceBuildCostById,
    GetWorkspaceBuildsCreatedAfter,
    GetWorkspaceAgentsCreatedAfter,
    GetWorkspaceAppsCreatedAfter,
    GetWorkspaceResourcesCreatedAfter,
    GetWorkspaceResourceMetadataCreatedAfter,
    InsertWorkspaceResource,
    InsertWorkspaceAgent,
    InsertWorkspaceApp,
    InsertWorkspaceResourceMetadata,
}

impl SystemOperation {
    pub const ALL: [Self; 23] = [
        Self::GetLatestWorkspaceBuilds,
        Self::GetWorkspaceAgentByAuthToken,
        Self::GetWorkspaceAgentByInstanceId,
        Self::GetWorkspaceResourceById,
        Self::GetActiveUserCount,
        Self::GetAuthorizationUserRoles,
        Self::GetDerpMeshKey,
        Self::InsertDerpMeshKey,
        Self::InsertDeploymentId,
        Self::InsertReplica,
        Self::UpdateReplica,
        Self::DeleteReplicasUpdatedBefore,
        Self::GetReplicasUpdatedAfter,
        Self::UpdateWorkspaceBuildCostById,
        Self::GetWorkspaceBuildsCreatedAfter,
        Self::GetWorkspaceAgentsCreatedAfter,
        Self::GetWorkspaceAppsCreatedAfter,
        Self::GetWorkspaceResourcesCreatedAfter,
        Self::GetWorkspaceResourceMetadataCreatedAfter,
        Self::InsertWorkspaceResource,
        Self::InsertWorkspaceAgent,
        Self::InsertWorkspaceApp,
        Self::InsertWorkspaceResourceMetadata,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetLatestWorkspaceBuilds => "get_latest_workspace_builds",
            Self::GetWorkspaceAgentByAuthToken => "get_workspace_agent_by_auth_token",
            Self::GetWorkspaceAgentByInstanceId => "get_workspace_agent_by_instance_id",
            Self::GetWorkspaceResourceById => "get_workspace_resource_by_id",
            Self::GetActiveUserCount => "get_active_user_count",
            Self::GetAuthorizationUserRoles => "get_authorization_user_roles",
            Self::GetDerpMeshKey => "get_derp_mesh_key",
            Self::InsertDerpMeshKey => "insert_derp_mesh_key",
            Self::InsertDeploymentId => "insert_deployment_id",
            Self::InsertReplica => "insert_replica",
            Self::UpdateReplica => "update_replica",
            Self::DeleteReplicasUpdatedBefore => "delete_replicas_updated_before",
            Self::GetReplicasUpdatedAfter => "get_replicas_updated_after",
            Self::UpdateWorkspaceBuildCostById => "update_workspace_build_cost_by_id",
            Self::GetWorkspaceBuildsCreatedAfter => "get_workspace_builds_created_after",
            Self::GetWorkspaceAgentsCreatedAfter => "get_workspace_agents_created_after",
            Self::GetWorkspaceAppsCreatedAfter => "get_workspace_apps_created_after",
            Self::GetWorkspaceResourcesCreatedAfter => "get_workspace_resources_created_after",
            Self::GetWorkspaceResourceMetadataCreatedAfter => {
                "get_workspace_resource_metadata_created_after"
            }
            Self::InsertWorkspaceResource => "insert_workspace_resource",
            Self::InsertWorkspaceAgent => "insert_workspace_agent",
            Self::InsertWorkspaceApp => "insert_workspace_app",
            Self::InsertWorkspaceResourceMetadata => "insert_workspace_resource_metadata",
        }
    }

    /// Who calls this operation and why it cannot be checked per row.
    #[must_use]
    pub fn justification(self) -> &'static str {
        match self {
            Self::GetLatestWorkspaceBuilds => {
                "usage reporting aggregates the current build of every workspace"
            }
            Self::GetWorkspaceAgentByAuthToken => {
                "agent middleware resolves the token before any subject exists"
            }
            Self::GetWorkspaceAgentByInstanceId => {
                "instance identity exchange runs before the agent is authenticated"
            }
            Self::GetWorkspaceResourceById => {
                "instance identity exchange and provisioner callbacks walk agent to job"
            }
            Self::GetActiveUserCount => "license and telemetry checks count users site-wide",
            Self::GetAuthorizationUserRoles => {
                "authentication expands a user's roles to build their subject"
            }
            Self::GetDerpMeshKey | Self::InsertDerpMeshKey => {
                "relay mesh key is shared infrastructure state between replicas"
            }
            Self::InsertDeploymentId => "deployment id is written once at first startup",
            Self::InsertReplica
            | Self::UpdateReplica
            | Self::DeleteReplicasUpdatedBefore
            | Self::GetReplicasUpdatedAfter => {
                "replica heartbeats are exchanged between nodes of one deployment"
            }
            Self::UpdateWorkspaceBuildCostById => {
                "the provisioner records build cost after the job completes"
            }
            Self::GetWorkspaceBuildsCreatedAfter
            | Self::GetWorkspaceAgentsCreatedAfter
            | Self::GetWorkspaceAppsCreatedAfter
            | Self::GetWorkspaceResourcesCreatedAfter
            | Self::GetWorkspaceResourceMetadataCreatedAfter => {
                "telemetry snapshots read recent rows across all owners"
            }
            Self::InsertWorkspaceResource
            | Self::InsertWorkspaceAgent
            | Self::InsertWorkspaceApp
            | Self::InsertWorkspaceResourceMetadata => {
                "provisioner result ingestion writes what the job produced"
            }
        }
    }

    /// The action checked against the `system` resource.
    #[must_use]
    pub fn action(self) -> Action {
        match self {
            Self::GetLatestWorkspaceBuilds
            | Self::GetWorkspaceAgentByAuthToken
            | Self::GetWorkspaceAgentByInstanceId
            | Self::GetWorkspaceResourceById
            | Self::GetActiveUserCount
            | Self::GetAuthorizationUserRoles
            | Self::GetDerpMeshKey
            | Self::GetReplicasUpdatedAfter
            | Self::GetWorkspaceBuildsCreatedAfter
            | Self::GetWorkspaceAgentsCreatedAfter
            | Self::GetWorkspaceAppsCreatedAfter
            | Self::GetWorkspaceResourcesCreatedAfter
            | Self::GetWorkspaceResourceMetadataCreatedAfter => Action::Read,
            Self::InsertDerpMeshKey
            | Self::InsertDeploymentId
            | Self::InsertReplica
            | Self::InsertWorkspaceResource
            | Self::InsertWorkspaceAgent
            | Self::InsertWorkspaceApp
            | Self::InsertWorkspaceResourceMetadata => Action::Create,
            Self::UpdateReplica | Self::UpdateWorkspaceBuildCostById => Action::Update,
            Self::DeleteReplicasUpdatedBefore => Action::Delete,
        }
    }
}

impl fmt::Display for SystemOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
