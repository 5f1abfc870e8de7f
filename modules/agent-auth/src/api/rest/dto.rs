use fleet_store::models::{Workspace, WorkspaceAgent, WorkspaceBuild, WorkspaceTransition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::identity::{AwsInstanceIdentity, AzureInstanceIdentity, GoogleInstanceIdentity};

// ── Instance identity exchange ──────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AwsInstanceIdentityToken {
    pub signature: String,
    pub document: String,
}

impl From<AwsInstanceIdentityToken> for AwsInstanceIdentity {
    fn from(t: AwsInstanceIdentityToken) -> Self {
        Self {
            signature: t.signature,
            document: t.document,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureInstanceIdentityToken {
    pub signature: String,
    pub encoding: String,
}

impl From<AzureInstanceIdentityToken> for AzureInstanceIdentity {
    fn from(t: AzureInstanceIdentityToken) -> Self {
        Self {
            signature: t.signature,
            encoding: t.encoding,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleInstanceIdentityToken {
    pub json_web_token: String,
}

impl From<GoogleInstanceIdentityToken> for GoogleInstanceIdentity {
    fn from(t: GoogleInstanceIdentityToken) -> Self {
        Self {
            json_web_token: t.json_web_token,
        }
    }
}

/// Token handed to an agent after a successful exchange.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    pub session_token: String,
}

// ── Agent self view ─────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentDto {
    pub id: Uuid,
    pub name: String,
    pub resource_id: Uuid,
    pub auth_instance_id: Option<String>,
}

impl From<WorkspaceAgent> for AgentDto {
    fn from(a: WorkspaceAgent) -> Self {
        Self {
            id: a.id,
            name: a.name,
            resource_id: a.resource_id,
            auth_instance_id: a.auth_instance_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentWorkspaceDto {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub organization_id: Uuid,
    pub template_id: Uuid,
}

impl From<Workspace> for AgentWorkspaceDto {
    fn from(w: Workspace) -> Self {
        Self {
            id: w.id,
            name: w.name,
            owner_id: w.owner_id,
            organization_id: w.organization_id,
            template_id: w.template_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentBuildDto {
    pub id: Uuid,
    pub build_number: i32,
    pub transition: WorkspaceTransition,
    pub job_id: Uuid,
}

impl From<WorkspaceBuild> for AgentBuildDto {
    fn from(b: WorkspaceBuild) -> Self {
        Self {
            id: b.id,
            build_number: b.build_number,
            transition: b.transition,
            job_id: b.job_id,
        }
    }
}

/// What an authenticated agent learns about itself.
#[derive(Debug, Serialize, Deserialize)]
pub struct AgentMeResponse {
    pub agent: AgentDto,
    pub workspace: AgentWorkspaceDto,
    pub latest_build: AgentBuildDto,
}
