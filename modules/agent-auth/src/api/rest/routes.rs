use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

use crate::api::rest::handlers;
use crate::api::rest::middleware::agent_auth_middleware;
use crate::api::rest::state::AgentAuthState;

pub const AGENT_ME_PATH: &str = "/api/v2/workspaceagents/me";
pub const AWS_IDENTITY_PATH: &str = "/api/v2/workspaceagents/aws-instance-identity";
pub const AZURE_IDENTITY_PATH: &str = "/api/v2/workspaceagents/azure-instance-identity";
pub const GOOGLE_IDENTITY_PATH: &str = "/api/v2/workspaceagents/google-instance-identity";

/// Agent routes. The identity exchange routes are public; everything else
/// requires an agent session token.
pub fn router(state: AgentAuthState) -> Router {
    let authenticated = Router::new()
        .route(AGENT_ME_PATH, get(handlers::get_agent_me))
        .route_layer(from_fn_with_state(state.clone(), agent_auth_middleware));

    Router::new()
        .route(AWS_IDENTITY_PATH, post(handlers::post_aws_instance_identity))
        .route(AZURE_IDENTITY_PATH, post(handlers::post_azure_instance_identity))
        .route(
            GOOGLE_IDENTITY_PATH,
            post(handlers::post_google_instance_identity),
        )
        .merge(authenticated)
        .with_state(state)
}
