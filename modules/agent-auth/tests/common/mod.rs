#![allow(dead_code)]

use std::sync::Arc;

use agent_auth::{AgentAuthConfig, AgentAuthState};
use authz_resolver_sdk::PolicyEnforcer;
use authz_store::AuthzStore;
use axum::Router;
use axum::body::Body;
use fleet_security::{AgentToken, RequestContext, SystemCaller};
use fleet_store::models::{
    InsertOrganizationMemberParams, InsertProvisionerJobParams, InsertTemplateParams,
    InsertUserParams, InsertWorkspaceAgentParams, InsertWorkspaceBuildParams,
    InsertWorkspaceParams, InsertWorkspaceResourceParams, ProvisionerJob, ProvisionerJobType, User,
    Workspace, WorkspaceAgent, WorkspaceBuild, WorkspaceProvisionJob, WorkspaceResource,
    WorkspaceTransition,
};
use fleet_store::{MemStore, Store};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{BasicConstraints, ExtendedKeyUsage, KeyUsage};
use openssl::x509::{X509, X509Builder, X509NameBuilder};
use static_authz_plugin::StaticAuthZPlugin;
use static_authz_plugin::config::StaticAuthZPluginConfig;
use tower::ServiceExt;
use uuid::Uuid;

pub const INSTANCE_ID: &str = "i-0123456789";

// ── Store fixture ───────────────────────────────────────────────────

pub fn provisioner_ctx() -> RequestContext {
    RequestContext::new().as_system(SystemCaller::Provisioner)
}

/// A user with one workspace whose latest build created an agent bound to
/// [`INSTANCE_ID`].
pub struct Fixture {
    pub org: Uuid,
    pub owner: User,
    pub workspace: Workspace,
    pub build: WorkspaceBuild,
    pub job: ProvisionerJob,
    pub resource: WorkspaceResource,
    pub agent: WorkspaceAgent,
}

/// The authorization decorator over an in-memory store, with built-in roles.
pub fn decorated_store() -> Arc<dyn Store> {
    let engine = StaticAuthZPlugin::init(&StaticAuthZPluginConfig::default());
    Arc::new(AuthzStore::new(MemStore::new(), PolicyEnforcer::new(engine)))
}

pub async fn seed(store: &dyn Store) -> Fixture {
    let ctx = provisioner_ctx();
    let org = Uuid::new_v4();
    let owner = store
        .insert_user(
            &ctx,
            InsertUserParams {
                id: Uuid::new_v4(),
                email: "alice@example.com".to_owned(),
                username: "alice".to_owned(),
                rbac_roles: vec!["member".to_owned()],
            },
        )
        .await
        .unwrap();
    store
        .insert_organization_member(
            &ctx,
            InsertOrganizationMemberParams {
                organization_id: org,
                user_id: owner.id,
                roles: Vec::new(),
            },
        )
        .await
        .unwrap();
    let template = store
        .insert_template(
            &ctx,
            InsertTemplateParams {
                organization_id: org,
                name: "aws-linux".to_owned(),
                created_by: owner.id,
            },
        )
        .await
        .unwrap();
    let workspace = store
        .insert_workspace(
            &ctx,
            InsertWorkspaceParams {
                owner_id: owner.id,
                organization_id: org,
                template_id: template.id,
                name: "dev".to_owned(),
            },
        )
        .await
        .unwrap();

    let (build, job) = start_build(store, &workspace).await;
    let resource = insert_resource(store, job.id).await;
    let agent = insert_agent(store, resource.id, Some(INSTANCE_ID)).await;

    Fixture {
        org,
        owner,
        workspace,
        build,
        job,
        resource,
        agent,
    }
}

/// Queue a new build of `workspace`, superseding any earlier one.
pub async fn start_build(
    store: &dyn Store,
    workspace: &Workspace,
) -> (WorkspaceBuild, ProvisionerJob) {
    let ctx = provisioner_ctx();
    let job_id = Uuid::new_v4();
    let build = store
        .insert_workspace_build(
            &ctx,
            InsertWorkspaceBuildParams {
                workspace_id: workspace.id,
                transition: WorkspaceTransition::Start,
                initiator_id: workspace.owner_id,
                job_id,
            },
        )
        .await
        .unwrap();
    let job = insert_job(
        store,
        job_id,
        workspace,
        ProvisionerJobType::WorkspaceBuild,
        serde_json::to_value(WorkspaceProvisionJob {
            workspace_build_id: build.id,
        })
        .unwrap(),
    )
    .await;
    (build, job)
}

pub async fn insert_job(
    store: &dyn Store,
    id: Uuid,
    workspace: &Workspace,
    job_type: ProvisionerJobType,
    input: serde_json::Value,
) -> ProvisionerJob {
    store
        .insert_provisioner_job(
            &provisioner_ctx(),
            InsertProvisionerJobParams {
                id,
                organization_id: workspace.organization_id,
                initiator_id: workspace.owner_id,
                job_type,
                input,
            },
        )
        .await
        .unwrap()
}

pub async fn insert_resource(store: &dyn Store, job_id: Uuid) -> WorkspaceResource {
    store
        .insert_workspace_resource(
            &provisioner_ctx(),
            InsertWorkspaceResourceParams {
                id: Uuid::new_v4(),
                job_id,
                transition: WorkspaceTransition::Start,
                resource_type: "aws_instance".to_owned(),
                name: "dev".to_owned(),
            },
        )
        .await
        .unwrap()
}

pub async fn insert_agent(
    store: &dyn Store,
    resource_id: Uuid,
    instance_id: Option<&str>,
) -> WorkspaceAgent {
    store
        .insert_workspace_agent(
            &provisioner_ctx(),
            InsertWorkspaceAgentParams {
                id: Uuid::new_v4(),
                resource_id,
                name: "main".to_owned(),
                auth_token: AgentToken::generate(),
                auth_instance_id: instance_id.map(str::to_owned),
            },
        )
        .await
        .unwrap()
}

// ── HTTP ────────────────────────────────────────────────────────────

pub struct App {
    pub router: Router,
    pub store: Arc<dyn Store>,
    pub fx: Fixture,
}

pub async fn app(config: &AgentAuthConfig) -> App {
    let store = decorated_store();
    let fx = seed(store.as_ref()).await;
    let state = AgentAuthState::new(Arc::clone(&store), config).unwrap();
    App {
        router: agent_auth::router(state),
        store,
        fx,
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn post_json(path: &str, body: &serde_json::Value) -> Request<Body> {
    Request::post(path)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ── Crypto fixtures ─────────────────────────────────────────────────

pub fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

/// What a test certificate is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertKind {
    Ca,
    /// No key usage extensions at all.
    Leaf,
    /// A TLS server certificate (`serverAuth`, `clientAuth`), the shape of
    /// the real metadata signing certificates.
    Tls,
}

/// An X.509 v3 certificate for `cn`, self-signed unless `issuer` is given.
pub fn certificate(
    cn: &str,
    key: &PKey<Private>,
    issuer: Option<(&X509, &PKey<Private>)>,
    kind: CertKind,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_slice(&Uuid::new_v4().as_bytes()[..8])
        .unwrap()
        .to_asn1_integer()
        .unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();
    match kind {
        CertKind::Ca => {
            builder
                .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
                .unwrap();
        }
        CertKind::Leaf => {}
        CertKind::Tls => {
            builder
                .append_extension(
                    KeyUsage::new()
                        .critical()
                        .digital_signature()
                        .key_encipherment()
                        .build()
                        .unwrap(),
                )
                .unwrap();
            builder
                .append_extension(
                    ExtendedKeyUsage::new()
                        .server_auth()
                        .client_auth()
                        .build()
                        .unwrap(),
                )
                .unwrap();
        }
    }
    match issuer {
        Some((issuer_cert, issuer_key)) => {
            builder
                .set_issuer_name(issuer_cert.subject_name())
                .unwrap();
            builder.sign(issuer_key, MessageDigest::sha256()).unwrap();
        }
        None => {
            builder.set_issuer_name(&name).unwrap();
            builder.sign(key, MessageDigest::sha256()).unwrap();
        }
    }
    builder.build()
}

pub fn pem(cert: &X509) -> String {
    String::from_utf8(cert.to_pem().unwrap()).unwrap()
}
