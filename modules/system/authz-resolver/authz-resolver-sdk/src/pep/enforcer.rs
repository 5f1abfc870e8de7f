//! Policy Enforcement Point (`PEP`) object.
//!
//! [`PolicyEnforcer`] encapsulates the PEP flow:
//! resolve the request's actor → short-circuit system callers → call the
//! policy engine → turn a deny decision into [`EnforcerError::Denied`].
//!
//! Constructed once during service initialisation with the policy engine.
//! The resource type or object is supplied per call, so a single enforcer
//! serves every resource type.

use std::sync::Arc;

use fleet_security::{
    AccessScope, Action, Actor, ContextError, Object, RequestContext, ResourceType, Subject,
};

use crate::api::PolicyEngine;
use crate::error::AuthZResolverError;
use crate::models::DenyReason;

/// Error from the PEP enforcement flow.
#[derive(Debug, thiserror::Error)]
pub enum EnforcerError {
    /// The policy engine explicitly denied access.
    #[error("access denied by PDP")]
    Denied {
        /// Optional deny reason from the engine.
        deny_reason: Option<DenyReason>,
    },

    /// The policy engine failed to evaluate.
    #[error("authorization evaluation failed: {0}")]
    EvaluationFailed(#[from] AuthZResolverError),

    /// The request context was never given an actor.
    #[error("request context carries no actor")]
    MissingActor,
}

impl From<ContextError> for EnforcerError {
    fn from(e: ContextError) -> Self {
        match e {
            ContextError::MissingActor => Self::MissingActor,
            // Liveness is checked by the caller; reading the actor never
            // reports it.
            ContextError::Cancelled | ContextError::DeadlineExceeded => {
                Self::EvaluationFailed(AuthZResolverError::Internal(e.to_string()))
            }
        }
    }
}

enum Resolved<'a> {
    System,
    Subject(&'a Subject),
}

fn resolve(ctx: &RequestContext) -> Result<Resolved<'_>, EnforcerError> {
    match ctx.actor()? {
        Actor::System(bypass) => {
            tracing::trace!(caller = %bypass.caller(), "system bypass, skipping policy engine");
            Ok(Resolved::System)
        }
        Actor::Subject(subject) => Ok(Resolved::Subject(subject)),
    }
}

/// Policy Enforcement Point.
///
/// Holds the policy engine. Constructed once during service init;
/// cloneable and cheap to pass around (`Arc` inside).
///
/// # Example
///
/// ```ignore
/// use authz_resolver_sdk::PolicyEnforcer;
/// use fleet_security::{Action, Objecter};
///
/// let enforcer = PolicyEnforcer::new(engine.clone());
///
/// enforcer.authorize(&ctx, Action::Update, &group.object()).await?;
/// let scope = enforcer.access_scope(&ctx, Action::Read, resources::USER).await?;
/// ```
#[derive(Clone)]
pub struct PolicyEnforcer {
    engine: Arc<dyn PolicyEngine>,
}

impl PolicyEnforcer {
    pub fn new(engine: Arc<dyn PolicyEngine>) -> Self {
        Self { engine }
    }

    /// Point check of `action` on `object` for the request's actor.
    ///
    /// System callers pass without consulting the engine.
    ///
    /// # Errors
    ///
    /// - [`EnforcerError::Denied`] if the engine denies
    /// - [`EnforcerError::EvaluationFailed`] if the engine call fails
    /// - [`EnforcerError::MissingActor`] if the context has no actor
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        action: Action,
        object: &Object,
    ) -> Result<(), EnforcerError> {
        let subject = match resolve(ctx)? {
            Resolved::System => return Ok(()),
            Resolved::Subject(subject) => subject,
        };

        let decision = self.engine.authorize(subject, action, object).await?;
        if decision.allowed {
            Ok(())
        } else {
            tracing::debug!(
                subject_id = %subject.id(),
                %action,
                %object,
                "policy engine denied access"
            );
            Err(EnforcerError::Denied {
                deny_reason: decision.deny_reason,
            })
        }
    }

    /// Predicate over objects of `resource` the request's actor may act on.
    ///
    /// System callers get an unconstrained scope.
    ///
    /// # Errors
    ///
    /// - [`EnforcerError::EvaluationFailed`] if the engine call fails
    /// - [`EnforcerError::MissingActor`] if the context has no actor
    pub async fn access_scope(
        &self,
        ctx: &RequestContext,
        action: Action,
        resource: ResourceType,
    ) -> Result<AccessScope, EnforcerError> {
        match resolve(ctx)? {
            Resolved::System => Ok(AccessScope::allow_all()),
            Resolved::Subject(subject) => Ok(self
                .engine
                .prepare_filter(subject, action, resource)
                .await?),
        }
    }
}

impl std::fmt::Debug for PolicyEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEnforcer").finish_non_exhaustive()
    }
}
