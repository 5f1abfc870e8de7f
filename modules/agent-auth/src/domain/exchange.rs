use std::sync::Arc;

use async_trait::async_trait;
use fleet_security::{AgentToken, RequestContext, SystemCaller};
use fleet_store::{Store, StoreError};
use fleet_store::models::{ProvisionerJobType, WorkspaceProvisionJob};
use tracing::{debug, info};

use crate::domain::error::{AgentAuthError, ExchangeStage};
use crate::domain::identity::CloudProvider;

/// Proves which cloud instance a caller runs on.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Identity document as presented by the instance.
    type Evidence: Send + Sync;

    fn provider(&self) -> CloudProvider;

    /// Validate `evidence` and return the instance id it attests to.
    ///
    /// # Errors
    ///
    /// [`AgentAuthError::InvalidIdentity`] when the document is malformed,
    /// untrusted or its signature does not verify.
    async fn verify(&self, evidence: &Self::Evidence) -> Result<String, AgentAuthError>;
}

/// Exchanges a verified instance identity for the agent token registered on
/// that instance.
pub struct InstanceIdentityExchange {
    store: Arc<dyn Store>,
}

impl InstanceIdentityExchange {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Verify `evidence` with `verifier`, then hand out the matching token.
    ///
    /// # Errors
    ///
    /// Any verification error, then the errors of [`Self::complete`].
    #[tracing::instrument(skip_all, fields(provider = %verifier.provider()))]
    pub async fn exchange<V: IdentityVerifier>(
        &self,
        ctx: &RequestContext,
        verifier: &V,
        evidence: &V::Evidence,
    ) -> Result<AgentToken, AgentAuthError> {
        let instance_id = verifier.verify(evidence).await?;
        debug!(instance_id = %instance_id, "instance identity verified");
        self.complete(ctx, &instance_id).await
    }

    /// Resolve the agent registered for `instance_id` and return its token,
    /// provided the agent belongs to its workspace's latest build.
    ///
    /// # Errors
    ///
    /// - [`AgentAuthError::InstanceNotFound`] when no agent claims the instance
    /// - [`AgentAuthError::UnsupportedJobType`] when the agent was not created
    ///   by a workspace build
    /// - [`AgentAuthError::StaleBuild`] when a newer build exists
    /// - [`AgentAuthError::Exchange`] for store failures along the way
    pub async fn complete(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
    ) -> Result<AgentToken, AgentAuthError> {
        let sys = ctx.as_system(SystemCaller::InstanceIdentity);
        let stage = |stage: ExchangeStage| {
            move |e: StoreError| AgentAuthError::exchange(stage, e.to_string())
        };

        let agent = self
            .store
            .get_workspace_agent_by_instance_id(&sys, instance_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    AgentAuthError::instance_not_found(instance_id)
                } else {
                    AgentAuthError::exchange(ExchangeStage::Agent, e.to_string())
                }
            })?;
        let resource = self
            .store
            .get_workspace_resource_by_id(&sys, agent.resource_id)
            .await
            .map_err(stage(ExchangeStage::Resource))?;
        let job = self
            .store
            .get_provisioner_job_by_id(&sys, resource.job_id)
            .await
            .map_err(stage(ExchangeStage::Job))?;
        if job.job_type != ProvisionerJobType::WorkspaceBuild {
            return Err(AgentAuthError::UnsupportedJobType {
                job_type: job.job_type.as_str().to_owned(),
            });
        }
        let input: WorkspaceProvisionJob = serde_json::from_value(job.input)
            .map_err(|e| AgentAuthError::exchange(ExchangeStage::JobInput, e.to_string()))?;

        let build = self
            .store
            .get_workspace_build_by_id(&sys, input.workspace_build_id)
            .await
            .map_err(stage(ExchangeStage::Build))?;
        let latest = self
            .store
            .get_latest_workspace_build_by_workspace_id(&sys, build.workspace_id)
            .await
            .map_err(stage(ExchangeStage::LatestBuild))?;
        if latest.id != build.id {
            return Err(AgentAuthError::stale_build(instance_id));
        }

        info!(
            agent_id = %agent.id,
            workspace_id = %build.workspace_id,
            "instance identity exchanged for agent token"
        );
        Ok(agent.auth_token)
    }
}
