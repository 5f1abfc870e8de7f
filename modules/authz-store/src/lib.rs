#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Authorization-enforcing [`Store`](fleet_store::Store) decorator.
//!
//! [`AuthzStore`] implements the same operation surface as the store it
//! wraps. Every operation is one instantiation of a small set of check
//! templates:
//!
//! - `fetch` - load, then authorize `read` against the loaded row
//! - `fetch_with_post_filter` - load a list, keep rows inside the caller's scope
//! - `update` / `delete_q` - load the pre-mutation row, authorize, then mutate
//! - `insert_with_return` - authorize `create` on a synthesized object, then insert
//!
//! Operations without a natural per-row object run as [`SystemOperation`]s,
//! authorized against the `system` resource.
//!
//! A denial is reported as [`StoreError::NotFound`](fleet_store::StoreError::NotFound),
//! so callers cannot distinguish "forbidden" from "absent".

mod checks;
mod querier;
pub mod system;

use authz_resolver_sdk::PolicyEnforcer;

pub use system::SystemOperation;

/// Wraps a [`Store`](fleet_store::Store) and enforces policy on every call.
pub struct AuthzStore<S> {
    inner: S,
    enforcer: PolicyEnforcer,
}

impl<S> AuthzStore<S> {
    #[must_use]
    pub fn new(inner: S, enforcer: PolicyEnforcer) -> Self {
        Self { inner, enforcer }
    }

    /// The wrapped store, bypassing every check. For wiring and tests only.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S> std::fmt::Debug for AuthzStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthzStore")
            .field("enforcer", &self.enforcer)
            .finish_non_exhaustive()
    }
}
