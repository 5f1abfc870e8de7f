#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use authz_resolver_sdk::{AuthZResolverError, Decision, DenyReason, PolicyEnforcer, PolicyEngine};
use authz_store::AuthzStore;
use fleet_security::{
    AccessScope, Action, AgentToken, Object, RequestContext, ResourceType, Subject, SystemCaller,
};
use fleet_store::models::{
    ApiKey, Group, InsertApiKeyParams, InsertGroupParams, InsertOrganizationMemberParams,
    InsertProvisionerJobParams, InsertTemplateParams, InsertUserParams,
    InsertWorkspaceAgentParams, InsertWorkspaceBuildParams, InsertWorkspaceParams,
    InsertWorkspaceResourceParams, LoginType, ProvisionerJob, ProvisionerJobType, Template, User,
    Workspace, WorkspaceAgent, WorkspaceBuild, WorkspaceProvisionJob, WorkspaceResource,
    WorkspaceTransition,
};
use fleet_store::{MemStore, Store};
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

// ── Recording policy engine ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
    Fail,
}

/// One call the decorator made into the policy engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Authorize {
        subject: Uuid,
        action: Action,
        object: Object,
    },
    Filter {
        subject: Uuid,
        action: Action,
        resource: ResourceType,
    },
}

/// Answers every check with a fixed verdict and remembers what it was asked.
pub struct RecordingEngine {
    verdict: Verdict,
    calls: Mutex<Vec<Call>>,
}

impl RecordingEngine {
    pub fn new(verdict: Verdict) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// The `(action, object)` pairs of every point check, in order.
    pub fn checks(&self) -> Vec<(Action, Object)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Authorize { action, object, .. } => Some((*action, object.clone())),
                Call::Filter { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl PolicyEngine for RecordingEngine {
    async fn authorize(
        &self,
        subject: &Subject,
        action: Action,
        object: &Object,
    ) -> Result<Decision, AuthZResolverError> {
        self.calls.lock().push(Call::Authorize {
            subject: subject.id(),
            action,
            object: object.clone(),
        });
        match self.verdict {
            Verdict::Allow => Ok(Decision::allow()),
            Verdict::Deny => Ok(Decision::deny(DenyReason::new("test_deny"))),
            Verdict::Fail => Err(AuthZResolverError::Internal("engine down".to_owned())),
        }
    }

    async fn prepare_filter(
        &self,
        subject: &Subject,
        action: Action,
        resource: ResourceType,
    ) -> Result<AccessScope, AuthZResolverError> {
        self.calls.lock().push(Call::Filter {
            subject: subject.id(),
            action,
            resource,
        });
        match self.verdict {
            Verdict::Allow => Ok(AccessScope::allow_all()),
            Verdict::Deny => Ok(AccessScope::deny_all()),
            Verdict::Fail => Err(AuthZResolverError::Internal("engine unavailable".to_owned())),
        }
    }
}

// ── Contexts ────────────────────────────────────────────────────────

pub fn system_ctx() -> RequestContext {
    RequestContext::new().as_system(SystemCaller::BackgroundJob)
}

pub fn member_ctx(user_id: Uuid) -> RequestContext {
    RequestContext::new().with_subject(Subject::builder(user_id).role("member").build())
}

pub fn subject_ctx(subject: Subject) -> RequestContext {
    RequestContext::new().with_subject(subject)
}

// ── Fixture ─────────────────────────────────────────────────────────

/// One organization with an owner, a stranger and a provisioned workspace.
pub struct Fixture {
    pub org: Uuid,
    pub owner: User,
    pub stranger: User,
    pub group: Group,
    pub template: Template,
    pub workspace: Workspace,
    pub build: WorkspaceBuild,
    pub job: ProvisionerJob,
    pub resource: WorkspaceResource,
    pub agent: WorkspaceAgent,
    pub api_key: ApiKey,
}

pub struct Harness {
    pub store: AuthzStore<MemStore>,
    pub engine: Arc<RecordingEngine>,
    pub fx: Fixture,
}

pub async fn harness(verdict: Verdict) -> Harness {
    let engine = RecordingEngine::new(verdict);
    let store = AuthzStore::new(MemStore::new(), PolicyEnforcer::new(engine.clone()));
    let fx = seed(&store).await;
    Harness { store, engine, fx }
}

/// Populate `store` under a system context.
pub async fn seed(store: &impl Store) -> Fixture {
    let ctx = system_ctx();
    let org = Uuid::new_v4();

    let owner = insert_user(store, "alice").await;
    let stranger = insert_user(store, "mallory").await;
    for user in [&owner, &stranger] {
        store
            .insert_organization_member(
                &ctx,
                InsertOrganizationMemberParams {
                    organization_id: org,
                    user_id: user.id,
                    roles: Vec::new(),
                },
            )
            .await
            .unwrap();
    }

    let group = store
        .insert_group(
            &ctx,
            InsertGroupParams {
                name: "developers".to_owned(),
                organization_id: org,
                quota_allowance: 10,
            },
        )
        .await
        .unwrap();

    let template = store
        .insert_template(
            &ctx,
            InsertTemplateParams {
                organization_id: org,
                name: "docker".to_owned(),
                created_by: owner.id,
            },
        )
        .await
        .unwrap();

    let workspace = insert_workspace(store, org, owner.id, template.id, "dev").await;
    let (build, job) = provision(store, &workspace, owner.id).await;

    let resource = store
        .insert_workspace_resource(
            &ctx,
            InsertWorkspaceResourceParams {
                id: Uuid::new_v4(),
                job_id: job.id,
                transition: WorkspaceTransition::Start,
                resource_type: "docker_container".to_owned(),
                name: "main".to_owned(),
            },
        )
        .await
        .unwrap();

    let agent = store
        .insert_workspace_agent(
            &ctx,
            InsertWorkspaceAgentParams {
                id: Uuid::new_v4(),
                resource_id: resource.id,
                name: "main".to_owned(),
                auth_token: AgentToken::generate(),
                auth_instance_id: Some("i-0123456789".to_owned()),
            },
        )
        .await
        .unwrap();

    let api_key = store
        .insert_api_key(
            &ctx,
            InsertApiKeyParams {
                user_id: owner.id,
                login_type: LoginType::Password,
                expires_at: OffsetDateTime::now_utc() + Duration::days(1),
            },
        )
        .await
        .unwrap();

    Fixture {
        org,
        owner,
        stranger,
        group,
        template,
        workspace,
        build,
        job,
        resource,
        agent,
        api_key,
    }
}

pub async fn insert_user(store: &impl Store, username: &str) -> User {
    store
        .insert_user(
            &system_ctx(),
            InsertUserParams {
                id: Uuid::new_v4(),
                email: format!("{username}@example.com"),
                username: username.to_owned(),
                rbac_roles: vec!["member".to_owned()],
            },
        )
        .await
        .unwrap()
}

pub async fn insert_workspace(
    store: &impl Store,
    org: Uuid,
    owner_id: Uuid,
    template_id: Uuid,
    name: &str,
) -> Workspace {
    store
        .insert_workspace(
            &system_ctx(),
            InsertWorkspaceParams {
                owner_id,
                organization_id: org,
                template_id,
                name: name.to_owned(),
            },
        )
        .await
        .unwrap()
}

/// Start a new build of `workspace` together with its provisioner job.
pub async fn provision(
    store: &impl Store,
    workspace: &Workspace,
    initiator_id: Uuid,
) -> (WorkspaceBuild, ProvisionerJob) {
    let ctx = system_ctx();
    let job_id = Uuid::new_v4();
    let build = store
        .insert_workspace_build(
            &ctx,
            InsertWorkspaceBuildParams {
                workspace_id: workspace.id,
                transition: WorkspaceTransition::Start,
                initiator_id,
                job_id,
            },
        )
        .await
        .unwrap();
    let job = store
        .insert_provisioner_job(
            &ctx,
            InsertProvisionerJobParams {
                id: job_id,
                organization_id: workspace.organization_id,
                initiator_id,
                job_type: ProvisionerJobType::WorkspaceBuild,
                input: serde_json::to_value(WorkspaceProvisionJob {
                    workspace_build_id: build.id,
                })
                .unwrap(),
            },
        )
        .await
        .unwrap();
    (build, job)
}
