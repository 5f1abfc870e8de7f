#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Agent session token authentication and the `me` route.

mod common;

use std::sync::Arc;

use agent_auth::api::rest::dto::AgentMeResponse;
use agent_auth::api::rest::routes::AGENT_ME_PATH;
use agent_auth::{AgentAuthConfig, AgentAuthError, AgentSubjectResolver};
use axum::body::Body;
use common::{app, decorated_store, seed, send};
use fleet_security::{AgentToken, RequestContext, Scope};
use fleet_store::models::UpdateWorkspaceParams;
use http::{Request, StatusCode};
use tracing_test::traced_test;

fn me_with_cookie(value: &str) -> Request<Body> {
    Request::get(AGENT_ME_PATH)
        .header(http::header::COOKIE, format!("fleet_session_token={value}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn missing_token_names_the_cookie() {
    let app = app(&AgentAuthConfig::default()).await;
    let request = Request::get(AGENT_ME_PATH).body(Body::empty()).unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        serde_json::json!({ "message": "Cookie \"fleet_session_token\" must be provided." })
    );
}

#[tokio::test]
async fn malformed_token_reports_its_length() {
    let app = app(&AgentAuthConfig::default()).await;

    let (status, body) = send(&app.router, me_with_cookie("not-a-uuid")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Workspace agent token invalid.");
    assert_eq!(
        body["detail"],
        "An agent token must be a valid UUIDv4. (len 10)"
    );
}

#[tokio::test]
async fn unknown_token_is_not_authorized() {
    let app = app(&AgentAuthConfig::default()).await;
    let stranger = AgentToken::generate().expose();

    let (status, body) = send(&app.router, me_with_cookie(&stranger)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Workspace agent not authorized.");
    assert!(
        body["detail"]
            .as_str()
            .unwrap()
            .contains("workspace provision job has been completed")
    );
}

#[tokio::test]
async fn valid_cookie_reaches_the_agent_view() {
    let app = app(&AgentAuthConfig::default()).await;
    let fx = &app.fx;

    let (status, body) = send(&app.router, me_with_cookie(&fx.agent.auth_token.expose())).await;
    assert_eq!(status, StatusCode::OK);
    let me: AgentMeResponse = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(me.agent.id, fx.agent.id);
    assert_eq!(me.agent.auth_instance_id.as_deref(), Some(common::INSTANCE_ID));
    assert_eq!(me.workspace.id, fx.workspace.id);
    assert_eq!(me.workspace.owner_id, fx.owner.id);
    assert_eq!(me.latest_build.id, fx.build.id);
    assert_eq!(me.latest_build.build_number, 1);
    // The credential itself is never echoed back.
    assert!(!body.to_string().contains(&fx.agent.auth_token.expose()));
}

#[tokio::test]
async fn configured_header_is_accepted() {
    let config = AgentAuthConfig {
        session_token_header: "X-Agent-Token".to_owned(),
        ..AgentAuthConfig::default()
    };
    let app = app(&config).await;
    let request = Request::get(AGENT_ME_PATH)
        .header("x-agent-token", app.fx.agent.auth_token.expose())
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent"]["id"], app.fx.agent.id.to_string());
}

#[tokio::test]
#[traced_test]
async fn tokens_are_not_logged() {
    let app = app(&AgentAuthConfig::default()).await;
    let raw = app.fx.agent.auth_token.expose();

    let (status, _) = send(&app.router, me_with_cookie(&raw)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(logs_contain("agent authenticated"));
    assert!(!logs_contain(&raw));
}

#[tokio::test]
async fn resolved_subject_is_the_owner_confined_to_the_workspace() {
    let store = decorated_store();
    let fx = seed(store.as_ref()).await;
    let resolver = AgentSubjectResolver::new(Arc::clone(&store));

    let authenticated = resolver
        .authenticate(&RequestContext::new(), fx.agent.auth_token)
        .await
        .unwrap();
    let subject = &authenticated.subject;
    assert_eq!(authenticated.agent.id, fx.agent.id);
    assert_eq!(subject.id(), fx.owner.id);
    assert!(subject.has_role("member"));
    assert!(subject.has_role(&format!("organization-member:{}", fx.org)));
    assert_eq!(
        subject.scope(),
        Scope::workspace_agent(fx.workspace.id, fx.owner.id)
    );
}

#[tokio::test]
async fn agent_context_can_update_only_its_own_workspace() {
    let store = decorated_store();
    let fx = seed(store.as_ref()).await;
    let other = store
        .insert_workspace(
            &common::provisioner_ctx(),
            fleet_store::models::InsertWorkspaceParams {
                owner_id: fx.owner.id,
                organization_id: fx.org,
                template_id: fx.workspace.template_id,
                name: "other".to_owned(),
            },
        )
        .await
        .unwrap();
    let resolver = AgentSubjectResolver::new(Arc::clone(&store));
    let authenticated = resolver
        .authenticate(&RequestContext::new(), fx.agent.auth_token)
        .await
        .unwrap();
    let ctx = RequestContext::new().with_subject(authenticated.subject);

    let renamed = store
        .update_workspace_by_id(
            &ctx,
            UpdateWorkspaceParams {
                id: fx.workspace.id,
                name: "dev-2".to_owned(),
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "dev-2");

    let err = store
        .update_workspace_by_id(
            &ctx,
            UpdateWorkspaceParams {
                id: other.id,
                name: "hijacked".to_owned(),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn unknown_token_is_a_distinct_error() {
    let store = decorated_store();
    seed(store.as_ref()).await;
    let resolver = AgentSubjectResolver::new(store);

    let err = resolver
        .authenticate(&RequestContext::new(), AgentToken::generate())
        .await
        .unwrap_err();
    assert_eq!(err, AgentAuthError::AgentNotAuthorized);
}
