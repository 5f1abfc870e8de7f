#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Workspace agent authentication.
//!
//! Two ways in for an agent: presenting its session token (resolved into a
//! workspace-scoped [`Subject`](fleet_security::Subject) by
//! [`AgentSubjectResolver`]), or proving which cloud instance it runs on and
//! receiving that token in exchange ([`InstanceIdentityExchange`]).
//!
//! Everything reads through the [`Store`](fleet_store::Store) handed in, which
//! is expected to be the authorization decorator.

pub mod api;
pub mod config;
pub mod domain;

pub use api::rest::routes::router;
pub use api::rest::state::AgentAuthState;
pub use config::AgentAuthConfig;
pub use domain::error::AgentAuthError;
pub use domain::exchange::{IdentityVerifier, InstanceIdentityExchange};
pub use domain::subject::{AgentSubjectResolver, AuthenticatedAgent};
