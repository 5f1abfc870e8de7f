use std::sync::Arc;

use fleet_security::{AgentToken, RequestContext, Scope, Subject, SystemCaller};
use fleet_store::Store;
use fleet_store::models::WorkspaceAgent;
use tracing::debug;

use crate::domain::error::AgentAuthError;

/// An agent that presented a valid token, with the identity it acts as.
#[derive(Debug, Clone)]
pub struct AuthenticatedAgent {
    pub agent: WorkspaceAgent,
    pub subject: Subject,
}

/// Turns an agent session token into a workspace-scoped [`Subject`].
///
/// The subject carries the workspace owner's id, roles and groups, narrowed
/// by [`Scope::WorkspaceAgent`] so it can only touch its own workspace.
pub struct AgentSubjectResolver {
    store: Arc<dyn Store>,
}

impl AgentSubjectResolver {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Look up the agent holding `token` and build its subject.
    ///
    /// # Errors
    ///
    /// [`AgentAuthError::AgentNotAuthorized`] when no agent holds the token,
    /// [`AgentAuthError::AgentLookup`] for any other store failure.
    #[tracing::instrument(skip(self, ctx, token), fields(token = %token))]
    pub async fn authenticate(
        &self,
        ctx: &RequestContext,
        token: AgentToken,
    ) -> Result<AuthenticatedAgent, AgentAuthError> {
        let sys = ctx.as_system(SystemCaller::AgentAuthentication);
        let agent = self
            .store
            .get_workspace_agent_by_auth_token(&sys, token)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    AgentAuthError::AgentNotAuthorized
                } else {
                    e.into()
                }
            })?;
        let subject = self.subject_for(ctx, &agent).await?;
        debug!(agent_id = %agent.id, subject_id = %subject.id(), "agent authenticated");
        Ok(AuthenticatedAgent { agent, subject })
    }

    /// Build the subject `agent` acts as.
    ///
    /// # Errors
    ///
    /// [`AgentAuthError::AgentLookup`] if the workspace, its owner or the
    /// owner's roles cannot be loaded.
    pub async fn subject_for(
        &self,
        ctx: &RequestContext,
        agent: &WorkspaceAgent,
    ) -> Result<Subject, AgentAuthError> {
        let sys = ctx.as_system(SystemCaller::AgentAuthentication);
        let workspace = self.store.get_workspace_by_agent_id(&sys, agent.id).await?;
        let owner = self.store.get_user_by_id(&sys, workspace.owner_id).await?;
        let roles = self.store.get_authorization_user_roles(&sys, owner.id).await?;

        Ok(Subject::builder(owner.id)
            .roles(roles.roles)
            .groups(roles.groups)
            .scope(Scope::workspace_agent(workspace.id, owner.id))
            .build())
    }
}
