#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Security primitives shared by every layer that touches persisted data.
//!
//! - [`Subject`] / [`SystemBypass`] - who is acting
//! - [`RequestContext`] - the per-request carrier of the actor plus cancellation
//! - [`Object`] / [`Action`] / [`ResourceType`] - what is being acted on
//! - [`AccessScope`] - compiled predicates used to filter result sets
//! - [`AgentToken`] - the session credential held by workspace agents

pub mod access_scope;
pub mod agent_token;
pub mod bypass;
pub mod context;
pub mod object;

pub use access_scope::{
    AccessScope, EqScopeFilter, InScopeFilter, ScopeConstraint, ScopeFilter, ScopeValue,
    pep_properties,
};
pub use agent_token::{AgentToken, AgentTokenParseError};
pub use bypass::{SystemBypass, SystemCaller};
pub use context::{Actor, ContextError, RequestContext, Scope, Subject, SubjectBuilder};
pub use object::{Action, Object, Objecter, ResourceType, resources};
