use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;

use crate::domain::error::AgentAuthError;

const AGENT_NOT_AUTHORIZED_DETAIL: &str = "The agent cannot authenticate until the workspace \
    provision job has been completed. If the job is no longer running, this agent is invalid.";

/// JSON error body returned by every agent route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Map an [`AgentAuthError`] to its status code and JSON body.
pub fn agent_auth_error_to_response(err: &AgentAuthError) -> Response {
    let (status, message, detail) = match err {
        AgentAuthError::MissingToken { cookie } => (
            StatusCode::UNAUTHORIZED,
            format!("Cookie \"{cookie}\" must be provided."),
            None,
        ),
        AgentAuthError::InvalidToken { len } => (
            StatusCode::UNAUTHORIZED,
            "Workspace agent token invalid.".to_owned(),
            Some(format!("An agent token must be a valid UUIDv4. (len {len})")),
        ),
        AgentAuthError::AgentNotAuthorized => (
            StatusCode::UNAUTHORIZED,
            "Workspace agent not authorized.".to_owned(),
            Some(AGENT_NOT_AUTHORIZED_DETAIL.to_owned()),
        ),
        AgentAuthError::AgentLookup(reason) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error fetching workspace agent.".to_owned(),
            Some(reason.clone()),
        ),
        AgentAuthError::InvalidIdentity { provider, reason } => (
            StatusCode::UNAUTHORIZED,
            format!("Invalid {provider} identity."),
            Some(reason.clone()),
        ),
        AgentAuthError::ClaimsDecode(reason) => (
            StatusCode::BAD_REQUEST,
            "Error decoding JWT claims.".to_owned(),
            Some(reason.clone()),
        ),
        AgentAuthError::InstanceNotFound { instance_id } => (
            StatusCode::NOT_FOUND,
            format!("Instance with id \"{instance_id}\" not found."),
            None,
        ),
        AgentAuthError::Exchange { stage, reason } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            stage.message().to_owned(),
            Some(reason.clone()),
        ),
        AgentAuthError::UnsupportedJobType { job_type } => (
            StatusCode::BAD_REQUEST,
            format!("\"{job_type}\" jobs cannot be authenticated."),
            None,
        ),
        AgentAuthError::StaleBuild { instance_id } => (
            StatusCode::BAD_REQUEST,
            format!(
                "Resource found for id \"{instance_id}\", but isn't registered on the latest history."
            ),
            None,
        ),
    };
    log_agent_auth_error(status, err);
    (status, Json(ErrorBody { message, detail })).into_response()
}

/// Log at a level matching the response class.
///
/// Cognitive complexity is inflated by tracing macro expansion.
#[allow(clippy::cognitive_complexity)]
fn log_agent_auth_error(status: StatusCode, err: &AgentAuthError) {
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = %err, "agent request failed");
    } else if status == StatusCode::BAD_REQUEST {
        tracing::warn!(status = status.as_u16(), error = %err, "agent request rejected");
    } else {
        tracing::debug!(status = status.as_u16(), error = %err, "agent request rejected");
    }
}

impl IntoResponse for AgentAuthError {
    fn into_response(self) -> Response {
        agent_auth_error_to_response(&self)
    }
}
