//! Client implementation for the static `AuthZ` resolver plugin.

use async_trait::async_trait;
use authz_resolver_sdk::{AuthZResolverError, Decision, DenyReason, PolicyEngine};
use fleet_security::{AccessScope, Action, Object, ResourceType, Subject};

use super::service::Service;

#[async_trait]
impl PolicyEngine for Service {
    async fn authorize(
        &self,
        subject: &Subject,
        action: Action,
        object: &Object,
    ) -> Result<Decision, AuthZResolverError> {
        if self.allows(subject, action, object) {
            return Ok(Decision::allow());
        }
        let code = if subject.scope().is_restricted() {
            "scope_restricted"
        } else {
            "insufficient_role"
        };
        Ok(Decision::deny(DenyReason::new(code)))
    }

    async fn prepare_filter(
        &self,
        subject: &Subject,
        action: Action,
        resource: ResourceType,
    ) -> Result<AccessScope, AuthZResolverError> {
        Ok(self.scope_for(subject, action, resource))
    }
}
