//! Public API trait for the policy decision point.

use async_trait::async_trait;
use fleet_security::{AccessScope, Action, Object, ResourceType, Subject};

use crate::error::AuthZResolverError;
use crate::models::Decision;

/// Policy decision point.
///
/// Implementations are shared across requests and must be safe for
/// concurrent use. A denial is a successful evaluation with
/// `Decision::allowed == false`; errors are reserved for evaluation failures.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    /// Decide whether `subject` may perform `action` on `object`.
    ///
    /// # Errors
    ///
    /// [`AuthZResolverError::Internal`] when the engine cannot reach a decision.
    async fn authorize(
        &self,
        subject: &Subject,
        action: Action,
        object: &Object,
    ) -> Result<Decision, AuthZResolverError>;

    /// Compile the set of objects of `resource` that `subject` may act on
    /// into a predicate usable to filter result sets.
    ///
    /// For any object `o` of that type, `prepare_filter(..).matches(o)` must
    /// agree with `authorize(.., o)`.
    ///
    /// # Errors
    ///
    /// Same as [`PolicyEngine::authorize`].
    async fn prepare_filter(
        &self,
        subject: &Subject,
        action: Action,
        resource: ResourceType,
    ) -> Result<AccessScope, AuthZResolverError>;
}
