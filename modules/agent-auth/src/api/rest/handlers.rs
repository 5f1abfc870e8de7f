use axum::Json;
use axum::extract::{Extension, State};
use fleet_security::RequestContext;
use fleet_store::models::WorkspaceAgent;
use tracing::field::Empty;

use crate::api::rest::dto::{
    AgentMeResponse, AuthenticateResponse, AwsInstanceIdentityToken, AzureInstanceIdentityToken,
    GoogleInstanceIdentityToken,
};
use crate::api::rest::middleware::BaseContext;
use crate::api::rest::state::AgentAuthState;
use crate::domain::error::AgentAuthError;
use crate::domain::identity::{AwsInstanceIdentity, AzureInstanceIdentity, GoogleInstanceIdentity};

/// The authenticated agent, its workspace and the workspace's latest build.
///
/// Reads run as the agent's scoped subject.
#[tracing::instrument(skip_all, fields(agent_id = %agent.id, workspace_id = Empty))]
pub async fn get_agent_me(
    State(state): State<AgentAuthState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(agent): Extension<WorkspaceAgent>,
) -> Result<Json<AgentMeResponse>, AgentAuthError> {
    let workspace = state.store.get_workspace_by_agent_id(&ctx, agent.id).await?;
    tracing::Span::current().record("workspace_id", tracing::field::display(workspace.id));
    let latest_build = state
        .store
        .get_latest_workspace_build_by_workspace_id(&ctx, workspace.id)
        .await?;

    Ok(Json(AgentMeResponse {
        agent: agent.into(),
        workspace: workspace.into(),
        latest_build: latest_build.into(),
    }))
}

#[tracing::instrument(skip_all)]
pub async fn post_aws_instance_identity(
    State(state): State<AgentAuthState>,
    BaseContext(ctx): BaseContext,
    Json(body): Json<AwsInstanceIdentityToken>,
) -> Result<Json<AuthenticateResponse>, AgentAuthError> {
    let evidence = AwsInstanceIdentity::from(body);
    let token = state
        .exchange
        .exchange(&ctx, &state.verifiers.aws, &evidence)
        .await?;
    Ok(Json(AuthenticateResponse {
        session_token: token.expose(),
    }))
}

#[tracing::instrument(skip_all)]
pub async fn post_azure_instance_identity(
    State(state): State<AgentAuthState>,
    BaseContext(ctx): BaseContext,
    Json(body): Json<AzureInstanceIdentityToken>,
) -> Result<Json<AuthenticateResponse>, AgentAuthError> {
    let evidence = AzureInstanceIdentity::from(body);
    let token = state
        .exchange
        .exchange(&ctx, &state.verifiers.azure, &evidence)
        .await?;
    Ok(Json(AuthenticateResponse {
        session_token: token.expose(),
    }))
}

#[tracing::instrument(skip_all)]
pub async fn post_google_instance_identity(
    State(state): State<AgentAuthState>,
    BaseContext(ctx): BaseContext,
    Json(body): Json<GoogleInstanceIdentityToken>,
) -> Result<Json<AuthenticateResponse>, AgentAuthError> {
    let evidence = GoogleInstanceIdentity::from(body);
    let token = state
        .exchange
        .exchange(&ctx, &state.verifiers.gcp, &evidence)
        .await?;
    Ok(Json(AuthenticateResponse {
        session_token: token.expose(),
    }))
}
