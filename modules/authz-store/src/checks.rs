//! The check templates every decorated operation is built from.
//!
//! Loaders are passed as unpolled futures and mutators as closures, so the
//! wrapped store is only reached in the order the template dictates:
//! resolve actor → load → authorize → liveness check → mutate.

use std::future::Future;

use authz_resolver_sdk::EnforcerError;
use fleet_security::{Action, Object, Objecter, RequestContext, ResourceType, resources};
use fleet_store::StoreError;

use crate::AuthzStore;
use crate::system::SystemOperation;

/// A row paired with the object it is authorized through.
///
/// Used for records that carry no ownership of their own (agents) and are
/// checked against the workspace they belong to.
pub struct Owned<T> {
    pub value: T,
    object: Object,
}

impl<T> Owned<T> {
    pub fn new(value: T, object: Object) -> Self {
        Self { value, object }
    }
}

impl<T> Objecter for Owned<T> {
    fn object(&self) -> Object {
        self.object.clone()
    }
}

fn enforcement_error(e: EnforcerError, action: Action, object: &str) -> StoreError {
    match e {
        EnforcerError::Denied { deny_reason } => {
            tracing::debug!(
                %action,
                object,
                reason = deny_reason.as_ref().map(|r| r.error_code.as_str()),
                "access denied, reporting not found"
            );
            StoreError::NotFound
        }
        EnforcerError::EvaluationFailed(_) | EnforcerError::MissingActor => {
            tracing::error!(error = %e, %action, object, "authorization check failed");
            StoreError::internal(e.to_string())
        }
    }
}

impl<S> AuthzStore<S> {
    /// Fail loudly when the context was never given an actor.
    fn require_actor(ctx: &RequestContext) -> Result<(), StoreError> {
        ctx.actor().map(|_| ()).map_err(StoreError::from)
    }

    async fn authorize(
        &self,
        ctx: &RequestContext,
        action: Action,
        object: &Object,
    ) -> Result<(), StoreError> {
        self.enforcer
            .authorize(ctx, action, object)
            .await
            .map_err(|e| enforcement_error(e, action, &object.to_string()))
    }

    /// Load one row and authorize `read` against it.
    #[tracing::instrument(level = "debug", skip_all)]
    pub(crate) async fn fetch<T, L>(
        &self,
        ctx: &RequestContext,
        loader: L,
    ) -> Result<T, StoreError>
    where
        T: Objecter,
        L: Future<Output = Result<T, StoreError>>,
    {
        Self::require_actor(ctx)?;
        let row = loader.await?;
        self.authorize(ctx, Action::Read, &row.object()).await?;
        Ok(row)
    }

    /// Load a list and keep the rows inside the caller's `read` scope,
    /// preserving order.
    #[tracing::instrument(level = "debug", skip_all, fields(resource = resource.name))]
    pub(crate) async fn fetch_with_post_filter<T, L>(
        &self,
        ctx: &RequestContext,
        resource: ResourceType,
        lister: L,
    ) -> Result<Vec<T>, StoreError>
    where
        T: Objecter,
        L: Future<Output = Result<Vec<T>, StoreError>>,
    {
        Self::require_actor(ctx)?;
        let rows = lister.await?;
        let scope = self
            .enforcer
            .access_scope(ctx, Action::Read, resource)
            .await
            .map_err(|e| enforcement_error(e, Action::Read, resource.name))?;
        if scope.is_unconstrained() {
            return Ok(rows);
        }
        Ok(rows
            .into_iter()
            .filter(|row| scope.matches(&row.object()))
            .collect())
    }

    /// Authorize `action` against the row `loader` returns, as it is before
    /// the mutation, then run `mutator`.
    ///
    /// Covers both update shapes (with and without a returned row) and,
    /// with [`Action::Delete`], `delete_q`.
    #[tracing::instrument(level = "debug", skip_all, fields(%action))]
    pub(crate) async fn update<T, R, L, M, F>(
        &self,
        ctx: &RequestContext,
        action: Action,
        loader: L,
        mutator: M,
    ) -> Result<R, StoreError>
    where
        T: Objecter,
        L: Future<Output = Result<T, StoreError>>,
        M: FnOnce() -> F,
        F: Future<Output = Result<R, StoreError>>,
    {
        Self::require_actor(ctx)?;
        let object = loader.await?.object();
        self.authorize_then(ctx, action, &object, mutator).await
    }

    /// [`AuthzStore::update`] with [`Action::Delete`].
    #[tracing::instrument(level = "debug", skip_all)]
    pub(crate) async fn delete_q<T, L, M, F>(
        &self,
        ctx: &RequestContext,
        loader: L,
        deleter: M,
    ) -> Result<(), StoreError>
    where
        T: Objecter,
        L: Future<Output = Result<T, StoreError>>,
        M: FnOnce() -> F,
        F: Future<Output = Result<(), StoreError>>,
    {
        self.update(ctx, Action::Delete, loader, deleter).await
    }

    /// Authorize `create` against a synthesized object, then insert.
    #[tracing::instrument(level = "debug", skip_all, fields(%object))]
    pub(crate) async fn insert_with_return<R, M, F>(
        &self,
        ctx: &RequestContext,
        object: Object,
        inserter: M,
    ) -> Result<R, StoreError>
    where
        M: FnOnce() -> F,
        F: Future<Output = Result<R, StoreError>>,
    {
        Self::require_actor(ctx)?;
        self.authorize_then(ctx, Action::Create, &object, inserter)
            .await
    }

    /// Authorize `action` against a representative object standing in for
    /// every row the mutation touches, then run it.
    #[tracing::instrument(level = "debug", skip_all, fields(%action, %object))]
    pub(crate) async fn representative<R, M, F>(
        &self,
        ctx: &RequestContext,
        action: Action,
        object: Object,
        mutator: M,
    ) -> Result<R, StoreError>
    where
        M: FnOnce() -> F,
        F: Future<Output = Result<R, StoreError>>,
    {
        Self::require_actor(ctx)?;
        self.authorize_then(ctx, action, &object, mutator).await
    }

    /// Run an allowlisted operation that has no per-row object.
    #[tracing::instrument(level = "debug", skip_all, fields(operation = op.as_str()))]
    pub(crate) async fn system<R, F>(
        &self,
        ctx: &RequestContext,
        op: SystemOperation,
        call: F,
    ) -> Result<R, StoreError>
    where
        F: Future<Output = Result<R, StoreError>>,
    {
        Self::require_actor(ctx)?;
        tracing::trace!(
            operation = op.as_str(),
            justification = op.justification(),
            "system operation"
        );
        self.authorize_then(ctx, op.action(), &resources::SYSTEM.object(), || call)
            .await
    }

    async fn authorize_then<R, M, F>(
        &self,
        ctx: &RequestContext,
        action: Action,
        object: &Object,
        run: M,
    ) -> Result<R, StoreError>
    where
        M: FnOnce() -> F,
        F: Future<Output = Result<R, StoreError>>,
    {
        self.authorize(ctx, action, object).await?;
        ctx.ensure_live()?;
        run().await
    }
}
