#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end checks with the built-in role engine.

mod common;

use authz_resolver_sdk::PolicyEnforcer;
use authz_store::AuthzStore;
use common::{Fixture, insert_workspace, seed, subject_ctx, system_ctx};
use fleet_security::{Scope, Subject};
use fleet_store::models::{InsertApiKeyParams, LoginType, UpdateWorkspaceParams, Workspace};
use fleet_store::{MemStore, Store, StoreError};
use static_authz_plugin::StaticAuthZPlugin;
use static_authz_plugin::config::StaticAuthZPluginConfig;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

struct World {
    store: AuthzStore<MemStore>,
    fx: Fixture,
    other_workspace: Workspace,
}

async fn world() -> World {
    let engine = StaticAuthZPlugin::init(&StaticAuthZPluginConfig::default());
    let store = AuthzStore::new(MemStore::new(), PolicyEnforcer::new(engine));
    let fx = seed(&store).await;
    let other_workspace =
        insert_workspace(&store, fx.org, fx.owner.id, fx.template.id, "other").await;
    World {
        store,
        fx,
        other_workspace,
    }
}

fn owner_roles(fx: &Fixture) -> Vec<String> {
    vec![
        "member".to_owned(),
        format!("organization-member:{}", fx.org),
    ]
}

fn owner(fx: &Fixture) -> Subject {
    Subject::builder(fx.owner.id).roles(owner_roles(fx)).build()
}

fn agent_of(fx: &Fixture) -> Subject {
    Subject::builder(fx.owner.id)
        .roles(owner_roles(fx))
        .scope(Scope::workspace_agent(fx.workspace.id, fx.owner.id))
        .build()
}

#[tokio::test]
async fn owner_reaches_everything_it_owns() {
    let w = world().await;
    let ctx = subject_ctx(owner(&w.fx));

    w.store
        .get_workspace_by_id(&ctx, w.other_workspace.id)
        .await
        .unwrap();
    w.store
        .get_template_by_id(&ctx, w.fx.template.id)
        .await
        .unwrap();
    assert_eq!(w.store.get_workspaces(&ctx).await.unwrap().len(), 2);
}

#[tokio::test]
async fn agent_subject_is_confined_to_its_workspace() {
    let w = world().await;
    let ctx = subject_ctx(agent_of(&w.fx));
    let fx = &w.fx;

    let own = w.store.get_workspace_by_id(&ctx, fx.workspace.id).await.unwrap();
    assert_eq!(own.id, fx.workspace.id);
    w.store.get_workspace_agent_by_id(&ctx, fx.agent.id).await.unwrap();
    w.store
        .get_latest_workspace_build_by_workspace_id(&ctx, fx.workspace.id)
        .await
        .unwrap();

    // The owner's roles would allow these; the agent scope does not.
    let err = w
        .store
        .get_workspace_by_id(&ctx, w.other_workspace.id)
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::NotFound);
    let err = w
        .store
        .get_template_by_id(&ctx, fx.template.id)
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::NotFound);
    let err = w
        .store
        .delete_workspace_by_id(&ctx, fx.workspace.id)
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::NotFound);

    let listed = w.store.get_workspaces(&ctx).await.unwrap();
    assert_eq!(listed, vec![fx.workspace.clone()]);
}

#[tokio::test]
async fn agent_subject_may_update_its_workspace() {
    let w = world().await;
    let ctx = subject_ctx(agent_of(&w.fx));

    let updated = w
        .store
        .update_workspace_by_id(
            &ctx,
            UpdateWorkspaceParams {
                id: w.fx.workspace.id,
                name: "dev-renamed".to_owned(),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "dev-renamed");

    let err = w
        .store
        .update_workspace_by_id(
            &ctx,
            UpdateWorkspaceParams {
                id: w.other_workspace.id,
                name: "escaped".to_owned(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::NotFound);
}

#[tokio::test]
async fn agent_subject_reads_only_its_owner() {
    let w = world().await;
    let ctx = subject_ctx(agent_of(&w.fx));

    w.store.get_user_by_id(&ctx, w.fx.owner.id).await.unwrap();
    let err = w
        .store
        .get_user_by_id(&ctx, w.fx.stranger.id)
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::NotFound);
    let users = w.store.get_users(&ctx).await.unwrap();
    assert_eq!(users, vec![w.fx.owner.clone()]);
}

#[tokio::test]
async fn api_keys_by_login_type_are_filtered_per_record() {
    let w = world().await;
    let fx = &w.fx;
    let expires_at = OffsetDateTime::now_utc() + Duration::days(7);
    let sys = system_ctx();
    let insert = |user_id: Uuid, login_type: LoginType| {
        w.store.insert_api_key(
            &sys,
            InsertApiKeyParams {
                user_id,
                login_type,
                expires_at,
            },
        )
    };
    // The fixture already holds one password key for the owner.
    let second = insert(fx.owner.id, LoginType::Password).await.unwrap();
    insert(fx.owner.id, LoginType::Token).await.unwrap();
    insert(fx.stranger.id, LoginType::Password).await.unwrap();

    let ctx = subject_ctx(owner(fx));
    let keys = w
        .store
        .get_api_keys_by_login_type(&ctx, LoginType::Password)
        .await
        .unwrap();
    let ids: Vec<Uuid> = keys.iter().map(|k| k.id).collect();
    assert_eq!(ids, vec![fx.api_key.id, second.id]);
    assert!(keys.iter().all(|k| k.user_id == fx.owner.id));
}

#[tokio::test]
async fn post_filter_is_idempotent() {
    let w = world().await;
    insert_workspace(&w.store, w.fx.org, w.fx.stranger.id, w.fx.template.id, "theirs").await;
    let ctx = subject_ctx(owner(&w.fx));

    let first = w.store.get_workspaces(&ctx).await.unwrap();
    let second = w.store.get_workspaces(&ctx).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.iter().map(|ws| ws.id).collect::<Vec<_>>(),
        vec![w.fx.workspace.id, w.other_workspace.id]
    );
}
